//! Python sources for the `diagrams` library (and one matplotlib fallback).
//!
//! All scripts write `<stem>.png` into their working directory.

use crate::prompt::ServiceSelection;
use crate::request::{ArchitectureRequest, Ec2Instance, Resource, SubnetType};
use crate::OutputTarget;

/// Upper bound on nodes drawn for one instance group.
const MAX_GROUP_NODES: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceKind {
    Ec2,
    S3,
    Rds,
    Lambda,
    Vpc,
    Generic(String),
}

impl ServiceKind {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "EC2" => ServiceKind::Ec2,
            "S3" => ServiceKind::S3,
            "RDS" => ServiceKind::Rds,
            "LAMBDA" => ServiceKind::Lambda,
            "VPC" => ServiceKind::Vpc,
            "" => ServiceKind::Generic("AWS".to_string()),
            other => ServiceKind::Generic(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ServiceKind::Ec2 => "EC2",
            ServiceKind::S3 => "S3",
            ServiceKind::Rds => "RDS",
            ServiceKind::Lambda => "LAMBDA",
            ServiceKind::Vpc => "VPC",
            ServiceKind::Generic(name) => name,
        }
    }
}

/// Quote `s` as a Python string literal.
pub fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn diagram_header(title: &str, target: &OutputTarget) -> String {
    format!(
        "with Diagram({}, show=False, filename={}, direction=\"TB\"):",
        py_str(title),
        py_str(&target.stem)
    )
}

/// Fixed template for a coarse service selection. Every kind has one.
pub fn render_service(selection: &ServiceSelection, target: &OutputTarget) -> String {
    match &selection.service {
        ServiceKind::Ec2 => ec2_template(selection.count, target),
        ServiceKind::S3 => s3_template(target),
        ServiceKind::Rds => rds_template(target),
        ServiceKind::Lambda => lambda_template(target),
        ServiceKind::Vpc => vpc_template(target),
        ServiceKind::Generic(name) => generic_template(name, target),
    }
}

fn ec2_template(count: u32, target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster, Edge
from diagrams.aws.compute import EC2, AutoScaling
from diagrams.aws.network import ELB, VPC, InternetGateway
from diagrams.aws.security import IAM
from diagrams.aws.management import Cloudwatch
from diagrams.aws.general import Users

{header}
    users = Users("Users")

    with Cluster("AWS Cloud Region"):
        vpc = VPC("VPC\n10.0.0.0/16")
        igw = InternetGateway("Internet Gateway")

        with Cluster("Load Balancing"):
            alb = ELB("Application\nLoad Balancer")

        with Cluster("Auto Scaling Group"):
            asg = AutoScaling("Auto Scaling Group")
            instances = [EC2(f"EC2 Instance {{i + 1}}\nt3.medium") for i in range({count})]

        with Cluster("Security & Monitoring"):
            iam = IAM("IAM Role")
            monitoring = Cloudwatch("CloudWatch")

    users >> Edge(label="HTTPS", color="blue") >> igw >> alb
    alb >> Edge(label="HTTP", color="green") >> asg

    for instance in instances:
        asg >> instance
        instance >> iam
        instance >> monitoring

    vpc >> igw
"#,
        header = diagram_header("EC2 Architecture", target),
        count = count.clamp(1, 5),
    )
}

fn s3_template(target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster, Edge
from diagrams.aws.storage import S3
from diagrams.aws.security import IAM, KMS
from diagrams.aws.network import CloudFront
from diagrams.aws.management import Cloudwatch
from diagrams.aws.general import Users

{header}
    users = Users("Users")

    with Cluster("AWS Cloud"):
        with Cluster("Content Delivery"):
            cdn = CloudFront("CloudFront CDN")

        with Cluster("Storage Layer"):
            primary = S3("Primary Bucket\n(Versioning)")
            backup = S3("Backup Bucket\n(Cross-Region)")

        with Cluster("Security"):
            kms = KMS("KMS Encryption")
            policy = IAM("Bucket Policy")

        monitoring = Cloudwatch("CloudWatch\nMetrics")

    users >> Edge(label="HTTPS", color="blue") >> cdn
    cdn >> Edge(label="Cache Miss", color="orange") >> primary
    primary >> Edge(label="Encrypted", color="red") >> kms
    primary >> policy
    primary >> Edge(label="Replication", color="green") >> backup
    primary >> monitoring
"#,
        header = diagram_header("S3 Architecture", target),
    )
}

fn rds_template(target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster, Edge
from diagrams.aws.database import RDS
from diagrams.aws.compute import EC2
from diagrams.aws.network import VPC
from diagrams.aws.security import IAM
from diagrams.aws.management import Cloudwatch

{header}
    with Cluster("AWS Cloud"):
        vpc = VPC("VPC")

        with Cluster("Application Tier"):
            app_servers = [EC2(f"App Server {{i + 1}}") for i in range(2)]

        with Cluster("Database Tier (Multi-AZ)"):
            primary_db = RDS("Primary DB\n(AZ a)")
            standby_db = RDS("Standby DB\n(AZ b)")

        with Cluster("Management"):
            iam = IAM("DB IAM Role")
            insights = Cloudwatch("Performance\nInsights")

    for app in app_servers:
        app >> Edge(label="Read/Write", color="blue") >> primary_db

    primary_db >> Edge(label="Sync Replication", color="red") >> standby_db
    primary_db >> iam
    primary_db >> insights
    vpc >> app_servers[0]
"#,
        header = diagram_header("RDS Architecture", target),
    )
}

fn lambda_template(target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster, Edge
from diagrams.aws.compute import Lambda
from diagrams.aws.network import APIGateway
from diagrams.aws.database import Dynamodb
from diagrams.aws.security import IAM
from diagrams.aws.management import Cloudwatch
from diagrams.aws.general import Users

{header}
    users = Users("Users")

    with Cluster("AWS Serverless"):
        api = APIGateway("API Gateway")
        function = Lambda("Lambda Function")
        table = Dynamodb("DynamoDB")

        with Cluster("Security & Monitoring"):
            role = IAM("Execution Role")
            logs = Cloudwatch("CloudWatch Logs")

    users >> Edge(label="HTTPS", color="blue") >> api
    api >> Edge(label="Invoke", color="green") >> function
    function >> Edge(label="Read/Write", color="orange") >> table
    function >> role
    function >> logs
"#,
        header = diagram_header("Serverless Architecture", target),
    )
}

fn vpc_template(target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster
from diagrams.aws.network import VPC, InternetGateway, NATGateway, PublicSubnet, PrivateSubnet, RouteTable
from diagrams.aws.compute import EC2

{header}
    internet = InternetGateway("Internet Gateway")

    with Cluster("VPC (10.0.0.0/16)"):
        vpc = VPC("Production VPC")

        with Cluster("Availability Zone A"):
            public_a = PublicSubnet("Public Subnet A\n10.0.10.0/24")
            private_a = PrivateSubnet("Private Subnet A\n10.0.11.0/24")
            nat_a = NATGateway("NAT Gateway A")
            web_a = EC2("Web Server A")
            app_a = EC2("App Server A")

        with Cluster("Availability Zone B"):
            public_b = PublicSubnet("Public Subnet B\n10.0.12.0/24")
            private_b = PrivateSubnet("Private Subnet B\n10.0.13.0/24")
            nat_b = NATGateway("NAT Gateway B")
            web_b = EC2("Web Server B")
            app_b = EC2("App Server B")

        routes = RouteTable("Route Tables")

    internet >> public_a >> nat_a >> private_a
    internet >> public_b >> nat_b >> private_b
    public_a >> web_a
    public_b >> web_b
    private_a >> app_a
    private_b >> app_b
    vpc >> routes
"#,
        header = diagram_header("VPC Architecture", target),
    )
}

fn generic_template(service: &str, target: &OutputTarget) -> String {
    format!(
        r#"from diagrams import Diagram, Cluster
from diagrams.aws.general import General
from diagrams.aws.security import IAM
from diagrams.aws.management import Cloudwatch

{header}
    with Cluster("AWS Cloud"):
        main_service = General({label})

        with Cluster("Security & Monitoring"):
            iam = IAM("IAM Role")
            monitoring = Cloudwatch("CloudWatch")

    main_service >> iam
    main_service >> monitoring
"#,
        header = diagram_header(&format!("{service} Architecture"), target),
        label = py_str(&format!("{service}\nService")),
    )
}

/// Last-resort chart drawn with matplotlib only.
pub fn render_static_fallback(service_label: &str, target: &OutputTarget) -> String {
    let label = if service_label.trim().is_empty() {
        "AWS"
    } else {
        service_label.trim()
    };
    format!(
        r##"import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import matplotlib.patches as patches

AWS_ORANGE = "#FF9900"
AWS_BLUE = "#232F3E"

fig, ax = plt.subplots(1, 1, figsize=(10, 6))

ax.add_patch(patches.Rectangle((2, 3), 6, 2, linewidth=2, edgecolor=AWS_BLUE, facecolor=AWS_ORANGE, alpha=0.8))
ax.text(5, 4, {service}, ha="center", va="center", fontsize=14, fontweight="bold", color="white")

ax.add_patch(patches.Rectangle((1, 1), 3, 1, linewidth=2, edgecolor=AWS_BLUE, facecolor="lightblue", alpha=0.7))
ax.text(2.5, 1.5, "Security\n(IAM)", ha="center", va="center", fontsize=10)

ax.add_patch(patches.Rectangle((6, 1), 3, 1, linewidth=2, edgecolor=AWS_BLUE, facecolor="lightgreen", alpha=0.7))
ax.text(7.5, 1.5, "Monitoring", ha="center", va="center", fontsize=10)

ax.arrow(4, 3, -1.5, -0.8, head_width=0.1, head_length=0.1, fc=AWS_BLUE, ec=AWS_BLUE)
ax.arrow(6, 3, 1.5, -0.8, head_width=0.1, head_length=0.1, fc=AWS_BLUE, ec=AWS_BLUE)

ax.set_xlim(0, 10)
ax.set_ylim(0, 6)
ax.set_aspect("equal")
ax.axis("off")
ax.set_title({title}, fontsize=16, fontweight="bold", pad=20)

plt.savefig({file}, dpi=150, bbox_inches="tight", facecolor="white")
plt.close(fig)
"##,
        service = py_str(&format!("{label}\nService")),
        title = py_str(&format!("AWS {label} Architecture (Fallback)")),
        file = py_str(&target.file_name()),
    )
}

// --- Structured rendering ---

struct Script {
    lines: Vec<String>,
}

impl Script {
    fn new() -> Self {
        Self { lines: Vec::new() }
    }

    fn line(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{}{}", "    ".repeat(depth), text.as_ref()));
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn finish(self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

fn node_list(kind: &str, labels: &[String]) -> String {
    let nodes: Vec<String> = labels
        .iter()
        .map(|l| format!("{kind}({})", py_str(l)))
        .collect();
    format!("[{}]", nodes.join(", "))
}

fn instance_labels(inst: &Ec2Instance) -> Vec<String> {
    let count = inst.count.clamp(1, MAX_GROUP_NODES);
    if count == 1 {
        return vec![format!("{}\n{}", inst.name, inst.instance_type)];
    }
    (1..=count)
        .map(|j| format!("{}-{j}\n{}", inst.name, inst.instance_type))
        .collect()
}

fn resource_labels(items: &[Resource], fallback: &str) -> Vec<String> {
    let names: Vec<String> = items
        .iter()
        .map(|r| r.name.trim())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        vec![fallback.to_string()]
    } else {
        names
    }
}

/// Emit instance groups at `depth`; returns the variable names used.
fn emit_instances(
    script: &mut Script,
    depth: usize,
    prefix: &str,
    instances: &[&Ec2Instance],
) -> Vec<String> {
    let mut vars = Vec::new();
    for (i, inst) in instances.iter().enumerate() {
        let var = format!("{prefix}_{}", i + 1);
        let labels = instance_labels(inst);
        if labels.len() > 1 {
            script.line(depth, format!("with Cluster({}):", py_str(&format!("{} Auto Scaling", inst.name))));
            script.line(depth + 1, format!("asg_{prefix}_{} = AutoScaling(\"Auto Scaling Group\")", i + 1));
            script.line(depth + 1, format!("{var} = {}", node_list("EC2", &labels)));
        } else {
            script.line(depth, format!("{var} = {}", node_list("EC2", &labels)));
        }
        vars.push(var);
    }
    vars
}

/// Script that draws the normalized request itself.
pub fn render_structured(request: &ArchitectureRequest, target: &OutputTarget) -> String {
    let arch = &request.architecture;
    let net = &request.networking;
    let compute = &request.compute;
    let db = &request.database;
    let storage = &request.storage;

    let title = if request.diagram_description.trim().is_empty() {
        format!("AWS Architecture - {}", arch.region)
    } else {
        request.diagram_description.trim().to_string()
    };

    let public_subnets: Vec<_> = request.public_subnets().collect();
    let private_subnets: Vec<_> = request.private_subnets().collect();
    let (public_ec2, private_ec2): (Vec<&Ec2Instance>, Vec<&Ec2Instance>) = if compute.ec2.enabled {
        compute
            .ec2
            .instances
            .iter()
            .partition(|i| i.subnet_type == SubnetType::Public)
    } else {
        (Vec::new(), Vec::new())
    };

    let mut s = Script::new();
    s.line(0, "from diagrams import Diagram, Cluster, Edge");
    s.line(0, "from diagrams.aws.general import Users");
    s.line(0, "from diagrams.aws.network import VPC, PublicSubnet, PrivateSubnet, InternetGateway, NATGateway, ELB");
    s.line(0, "from diagrams.aws.compute import EC2, Lambda, ECS, AutoScaling");
    s.line(0, "from diagrams.aws.database import RDS, Dynamodb");
    s.line(0, "from diagrams.aws.storage import S3, EFS");
    s.line(0, "from diagrams.aws.management import Cloudwatch");
    s.blank();
    s.line(0, diagram_header(&title, target));
    s.line(1, "users = Users(\"Users\")");
    s.blank();
    s.line(1, format!("with Cluster({}):", py_str(&format!("AWS Cloud ({})", arch.region))));
    let region_start = s.lines.len();

    let mut has_igw = false;
    if net.vpc.enabled {
        s.line(2, format!("vpc = VPC({})", py_str(&format!("VPC\n{}", net.vpc.cidr))));
        if net.internet_gateway {
            s.line(2, "igw = InternetGateway(\"Internet Gateway\")");
            has_igw = true;
        }
    }

    if net.load_balancer.enabled {
        s.blank();
        s.line(2, "with Cluster(\"Load Balancing\"):");
        s.line(3, format!("alb = ELB({})", py_str(&format!("{} Load Balancer", title_case(&net.load_balancer.kind)))));
    }

    let mut web_vars = Vec::new();
    let mut has_public_subnet = false;
    if !public_subnets.is_empty() {
        s.blank();
        s.line(2, "with Cluster(\"Public Subnets\"):");
        for (i, subnet) in public_subnets.iter().enumerate() {
            let label = format!("{}\n{}\nAZ-{}", subnet.name, subnet.cidr, subnet.az);
            s.line(3, format!("pub_subnet_{} = PublicSubnet({})", i + 1, py_str(&label)));
        }
        has_public_subnet = true;
        web_vars = emit_instances(&mut s, 3, "web", &public_ec2);
    }

    let mut app_vars = Vec::new();
    let mut has_nat = false;
    let mut has_rds = false;
    if !private_subnets.is_empty() {
        s.blank();
        s.line(2, "with Cluster(\"Private Subnets\"):");
        if net.nat_gateway {
            s.line(3, "nat = NATGateway(\"NAT Gateway\")");
            has_nat = true;
        }
        for (i, subnet) in private_subnets.iter().enumerate() {
            let label = format!("{}\n{}\nAZ-{}", subnet.name, subnet.cidr, subnet.az);
            s.line(3, format!("priv_subnet_{} = PrivateSubnet({})", i + 1, py_str(&label)));
        }
        app_vars = emit_instances(&mut s, 3, "app", &private_ec2);
        if db.rds.enabled {
            emit_rds(&mut s, 3, request);
            has_rds = true;
        }
    }

    // instances whose subnet tier was not drawn
    let mut loose: Vec<&Ec2Instance> = Vec::new();
    if public_subnets.is_empty() {
        loose.extend(public_ec2.iter().copied());
    }
    if private_subnets.is_empty() {
        loose.extend(private_ec2.iter().copied());
    }
    if !loose.is_empty() {
        s.blank();
        s.line(2, "with Cluster(\"Compute\"):");
        let vars = emit_instances(&mut s, 3, "server", &loose);
        if web_vars.is_empty() {
            web_vars = vars;
        } else {
            app_vars.extend(vars);
        }
    }

    if db.rds.enabled && !has_rds {
        emit_rds(&mut s, 2, request);
        has_rds = true;
    }

    let has_lambda = compute.lambda.enabled;
    if has_lambda {
        s.blank();
        s.line(2, "with Cluster(\"Serverless Compute\"):");
        let labels = resource_labels(&compute.lambda.functions, "Lambda Function");
        s.line(3, format!("functions = {}", node_list("Lambda", &labels)));
    }

    let has_ecs = compute.ecs.enabled;
    if has_ecs {
        s.blank();
        s.line(2, "with Cluster(\"Containers\"):");
        let labels = resource_labels(&compute.ecs.services, "ECS Service");
        s.line(3, format!("services = {}", node_list("ECS", &labels)));
    }

    let has_dynamodb = db.dynamodb.enabled;
    if has_dynamodb {
        s.blank();
        s.line(2, "with Cluster(\"NoSQL Database\"):");
        let labels = resource_labels(&db.dynamodb.tables, "DynamoDB Table");
        s.line(3, format!("tables = {}", node_list("Dynamodb", &labels)));
    }

    let has_s3 = storage.s3.enabled;
    let has_efs = storage.efs.enabled;
    if has_s3 || has_efs {
        s.blank();
        s.line(2, "with Cluster(\"Storage\"):");
        if has_s3 {
            let labels = resource_labels(&storage.s3.buckets, "static-files");
            s.line(3, format!("buckets = {}", node_list("S3", &labels)));
        }
        if has_efs {
            let labels = resource_labels(&storage.efs.file_systems, "Shared File System");
            s.line(3, format!("file_systems = {}", node_list("EFS", &labels)));
        }
    }

    let has_cloudwatch = request.monitoring.cloudwatch;
    if has_cloudwatch {
        s.blank();
        s.line(2, "with Cluster(\"Monitoring\"):");
        s.line(3, "cloudwatch = Cloudwatch(\"CloudWatch\")");
    }

    if s.lines.len() == region_start {
        s.line(2, "pass");
    }

    // --- connections ---
    s.blank();
    let mut entry = "users".to_string();
    if has_igw {
        s.line(1, format!("{entry} >> igw"));
        entry = "igw".to_string();
    }
    if net.load_balancer.enabled {
        s.line(1, format!("{entry} >> alb"));
        entry = "alb".to_string();
    }

    let web = web_vars.first();
    let app = app_vars.first();
    let front = web.or(app);
    if let Some(front) = front {
        s.line(1, format!("{entry} >> {front}"));
    } else if has_lambda {
        s.line(1, format!("{entry} >> functions"));
    } else if has_ecs {
        s.line(1, format!("{entry} >> services"));
    }

    if let (Some(web), Some(app)) = (web, app) {
        s.line(1, format!("{web} >> {app}[0]"));
    }
    if has_nat && has_public_subnet {
        s.line(1, "pub_subnet_1 >> nat");
    }
    if has_nat {
        if let Some(app) = app {
            s.line(1, format!("{app} >> nat"));
        }
    }
    if has_rds {
        if let Some(tier) = app.or(web) {
            s.line(1, format!("{tier} >> rds"));
        } else if has_ecs {
            s.line(1, "services >> rds");
        }
    }
    if has_lambda && has_dynamodb {
        s.line(1, "functions >> tables[0]");
    }
    if has_s3 {
        if let Some(tier) = front {
            s.line(1, format!("{tier} >> buckets[0]"));
        } else if has_lambda {
            s.line(1, "functions >> buckets[0]");
        }
    }
    if has_efs {
        if let Some(tier) = app.or(web) {
            s.line(1, format!("{tier} >> file_systems[0]"));
        }
    }
    if has_cloudwatch {
        if let Some(tier) = front {
            s.line(1, format!("{tier} >> cloudwatch"));
        } else if has_lambda {
            s.line(1, "functions >> cloudwatch");
        }
    }
    s.finish()
}

fn emit_rds(s: &mut Script, depth: usize, request: &ArchitectureRequest) {
    let rds = &request.database.rds;
    let placement = if rds.multi_az { "Multi-AZ" } else { "Single-AZ" };
    s.blank();
    s.line(depth, "with Cluster(\"Database Tier\"):");
    let labels: Vec<String> = if rds.instances.is_empty() {
        vec![format!("database\n{}\n{placement}", rds.engine.to_uppercase())]
    } else {
        rds.instances
            .iter()
            .map(|i| {
                format!(
                    "{}\n{}\n{}\n{placement}",
                    i.name,
                    i.engine.to_uppercase(),
                    i.instance_class
                )
            })
            .collect()
    };
    let nodes: Vec<String> = labels.iter().map(|l| format!("RDS({})", py_str(l))).collect();
    if nodes.len() == 1 {
        s.line(depth + 1, format!("rds = {}", nodes[0]));
    } else {
        s.line(depth + 1, format!("rds_nodes = [{}]", nodes.join(", ")));
        s.line(depth + 1, "rds = rds_nodes[0]");
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::from_text;

    fn target() -> OutputTarget {
        OutputTarget::new("cloudsketch_test")
    }

    #[test]
    fn every_service_has_a_template() {
        for name in ["EC2", "s3", "Rds", "LAMBDA", "vpc", "kinesis", ""] {
            let selection = ServiceSelection::new(ServiceKind::from_name(name), 3);
            let code = render_service(&selection, &target());
            assert!(code.starts_with("from diagrams import Diagram"), "{name}");
            assert!(code.contains("show=False, filename=\"cloudsketch_test\""), "{name}");
            assert!(code.contains("with Cluster("), "{name}");
        }
    }

    #[test]
    fn ec2_template_uses_count() {
        let code = render_service(&ServiceSelection::new(ServiceKind::Ec2, 4), &target());
        assert!(code.contains("for i in range(4)"));
        assert!(code.contains("f\"EC2 Instance {i + 1}\\nt3.medium\""));
    }

    #[test]
    fn generic_label_is_quoted() {
        let code = render_service(
            &ServiceSelection::new(ServiceKind::Generic("MY \"ODD\" SVC".into()), 1),
            &target(),
        );
        assert!(code.contains(r#"General("MY \"ODD\" SVC\nService")"#));
    }

    #[test]
    fn static_fallback_saves_png() {
        let code = render_static_fallback("EC2", &target());
        assert!(code.contains("matplotlib.use(\"Agg\")"));
        assert!(code.contains("plt.savefig(\"cloudsketch_test.png\", dpi=150"));
        assert!(code.contains("\"AWS EC2 Architecture (Fallback)\""));
    }

    #[test]
    fn structured_three_tier() {
        let request = from_text(
            "서울 리전 2개 AZ 고가용성, 퍼블릭 프라이빗 서브넷, ec2 3대, 로드밸런서, rds mysql, s3",
        );
        let code = render_structured(&request, &target());
        assert!(code.contains("with Cluster(\"AWS Cloud (ap-northeast-2)\"):"));
        assert!(code.contains("pub_subnet_2 = PublicSubnet(\"public-subnet-b\\n10.0.12.0/24\\nAZ-b\")"));
        assert!(code.contains("priv_subnet_2 = PrivateSubnet("));
        assert!(code.contains("nat = NATGateway(\"NAT Gateway\")"));
        assert!(code.contains("asg_web_1 = AutoScaling(\"Auto Scaling Group\")"));
        assert!(code.contains("EC2(\"web-server-3\\nt3.micro\")"));
        assert!(code.contains("rds = RDS(\"main-database\\nMYSQL\\ndb.t3.micro\\nMulti-AZ\")"));
        assert!(code.contains("    igw >> alb\n"));
        assert!(code.contains("    alb >> web_1\n"));
        assert!(code.contains("    web_1 >> app_1[0]\n"));
        assert!(code.contains("    app_1 >> rds\n"));
        assert!(code.contains("    web_1 >> buckets[0]\n"));
    }

    #[test]
    fn structured_serverless_without_vpc() {
        let mut request = from_text("lambda api with dynamodb");
        request.networking.vpc.subnets.clear();
        let code = render_structured(&request, &target());
        assert!(!code.contains("vpc = VPC"));
        assert!(code.contains("functions = [Lambda(\"Lambda Function\")]"));
        assert!(code.contains("tables = [Dynamodb(\"DynamoDB Table\")]"));
        assert!(code.contains("    users >> functions\n"));
        assert!(code.contains("    functions >> tables[0]\n"));
    }
}
