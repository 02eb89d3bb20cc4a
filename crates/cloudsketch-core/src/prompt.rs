use std::fmt::Write as _;

use crate::request::{ArchitectureRequest, Resource};
use crate::template::ServiceKind;
use crate::OutputTarget;

const DEFAULT_COUNT: u32 = 2;
const MAX_COUNT: u32 = 5;

/// Coarse service choice for the fixed templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSelection {
    pub service: ServiceKind,
    pub count: u32,
}

impl ServiceSelection {
    pub fn new(service: ServiceKind, count: u32) -> Self {
        Self {
            service,
            count: count.clamp(1, MAX_COUNT),
        }
    }

    /// Pick a template from free text. Honours `SERVICE:` and `COUNT:` lines
    /// written by [`template_prompt`], otherwise scans for service keywords.
    pub fn from_prompt(text: &str) -> Self {
        let upper = text.to_uppercase();

        let service = labelled(&upper, "SERVICE:")
            .map(ServiceKind::from_name)
            .unwrap_or_else(|| {
                if upper.contains("EC2") {
                    ServiceKind::Ec2
                } else if upper.contains("S3") {
                    ServiceKind::S3
                } else if upper.contains("RDS") || upper.contains("DATABASE") {
                    ServiceKind::Rds
                } else if upper.contains("LAMBDA") || upper.contains("SERVERLESS") {
                    ServiceKind::Lambda
                } else if upper.contains("VPC") || upper.contains("NETWORK") {
                    ServiceKind::Vpc
                } else {
                    ServiceKind::Generic("AWS".to_string())
                }
            });

        let count = labelled(&upper, "COUNT:")
            .and_then(|v| v.parse().ok())
            .or_else(|| first_standalone_number(&upper))
            .unwrap_or(DEFAULT_COUNT);

        Self::new(service, count)
    }

    pub fn from_request(request: &ArchitectureRequest) -> Self {
        let service = ServiceKind::from_name(request.primary_service());
        let count = match request.compute.ec2.total_count() {
            0 => DEFAULT_COUNT,
            n => n,
        };
        Self::new(service, count)
    }
}

fn labelled<'a>(upper: &'a str, label: &str) -> Option<&'a str> {
    upper
        .lines()
        .find_map(|line| line.trim().strip_prefix(label))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn first_standalone_number(text: &str) -> Option<u32> {
    text.split(|c: char| !c.is_ascii_alphanumeric())
        .find(|word| !word.is_empty() && word.chars().all(|c| c.is_ascii_digit()))
        .and_then(|word| word.parse().ok())
        .filter(|n| *n > 0)
}

/// Instruction text for the external CLI. Output depends only on the inputs.
pub fn cli_prompt(request: &ArchitectureRequest, target: &OutputTarget) -> String {
    let arch = &request.architecture;
    let net = &request.networking;
    let compute = &request.compute;
    let db = &request.database;
    let storage = &request.storage;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Create a professional AWS architecture diagram using the Python diagrams library."
    );
    let _ = writeln!(out);
    if !request.natural_language_input.is_empty() {
        let _ = writeln!(out, "User request: {}", request.natural_language_input);
    }
    let _ = writeln!(out, "Summary: {}", request.diagram_description);
    let _ = writeln!(out);

    let _ = writeln!(out, "ARCHITECTURE:");
    let _ = writeln!(out, "- Region: {}", arch.region);
    let _ = writeln!(out, "- Availability zones: {}", arch.availability_zones);
    let _ = writeln!(out, "- Complexity: {}", arch.complexity.as_str());
    let _ = writeln!(out, "- Type: {}", arch.kind.as_str());
    let _ = writeln!(out);

    let _ = writeln!(out, "NETWORKING:");
    if net.vpc.enabled {
        let _ = writeln!(out, "- VPC: {}", net.vpc.cidr);
        for subnet in &net.vpc.subnets {
            let _ = writeln!(
                out,
                "  - {} ({}, AZ {}, {})",
                subnet.name,
                subnet.kind.as_str(),
                subnet.az,
                subnet.cidr
            );
        }
    } else {
        let _ = writeln!(out, "- VPC: none");
    }
    let _ = writeln!(out, "- Internet gateway: {}", yes_no(net.internet_gateway));
    let _ = writeln!(out, "- NAT gateway: {}", yes_no(net.nat_gateway));
    if net.load_balancer.enabled {
        let _ = writeln!(out, "- Load balancer: {}", net.load_balancer.kind);
    } else {
        let _ = writeln!(out, "- Load balancer: no");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "COMPUTE:");
    if compute.ec2.enabled {
        for inst in &compute.ec2.instances {
            let _ = writeln!(
                out,
                "- EC2 {} x{} ({}, {} subnet, AZ {})",
                inst.name,
                inst.count.max(1),
                inst.instance_type,
                inst.subnet_type.as_str(),
                inst.az
            );
        }
        if compute.ec2.instances.is_empty() {
            let _ = writeln!(out, "- EC2");
        }
    }
    section_line(&mut out, "Lambda", compute.lambda.enabled, &compute.lambda.functions);
    section_line(&mut out, "ECS", compute.ecs.enabled, &compute.ecs.services);
    let _ = writeln!(out);

    let _ = writeln!(out, "DATABASE:");
    if db.rds.enabled {
        let _ = writeln!(
            out,
            "- RDS {} in {} subnets, multi-AZ: {}",
            db.rds.engine,
            db.rds.subnet_type.as_str(),
            yes_no(db.rds.multi_az)
        );
        for inst in &db.rds.instances {
            let _ = writeln!(
                out,
                "  - {} ({}, {}, AZ {})",
                inst.name, inst.engine, inst.instance_class, inst.az
            );
        }
    }
    section_line(&mut out, "DynamoDB", db.dynamodb.enabled, &db.dynamodb.tables);
    let _ = writeln!(out);

    let _ = writeln!(out, "STORAGE:");
    section_line(&mut out, "S3", storage.s3.enabled, &storage.s3.buckets);
    section_line(&mut out, "EFS", storage.efs.enabled, &storage.efs.file_systems);
    let _ = writeln!(out);

    let mut extras = Vec::new();
    if request.security.security_groups {
        extras.push("Security Groups");
    }
    if request.security.nacl {
        extras.push("Network ACLs");
    }
    if request.security.waf {
        extras.push("WAF");
    }
    if request.security.cloudtrail || request.monitoring.cloudtrail {
        extras.push("CloudTrail");
    }
    if request.monitoring.cloudwatch {
        extras.push("CloudWatch");
    }
    if request.monitoring.x_ray {
        extras.push("X-Ray");
    }
    if !extras.is_empty() && !request.optimization_hints.exclude_security {
        let _ = writeln!(out, "SECURITY & MONITORING: {}", extras.join(", "));
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "REQUIREMENTS:");
    let _ = writeln!(
        out,
        "1. Import from diagrams (Diagram, Cluster, Edge) and use AWS icons from diagrams.aws.*"
    );
    let _ = writeln!(
        out,
        "2. Use show=False and filename=\"{}\" so the output is {}",
        target.stem,
        target.file_name()
    );
    let _ = writeln!(
        out,
        "3. Group resources with Cluster for the region, VPC, availability zones and subnets"
    );
    let _ = writeln!(out, "4. Draw only the services listed above and connect them with Edge");
    let _ = writeln!(out, "5. Write the PNG to the current directory");
    let _ = writeln!(out);
    let _ = write!(
        out,
        "Reply with the complete Python code in a single ```python block and nothing else."
    );
    out
}

/// Compact block for template selection, readable by [`ServiceSelection::from_prompt`].
pub fn template_prompt(request: &ArchitectureRequest) -> String {
    let selection = ServiceSelection::from_request(request);
    let mut out = String::new();
    let _ = writeln!(out, "SERVICE: {}", selection.service.name());
    let _ = writeln!(out, "COUNT: {}", selection.count);
    let _ = writeln!(out, "REGION: {}", request.architecture.region);
    let _ = writeln!(
        out,
        "AVAILABILITY_ZONES: {}",
        request.architecture.availability_zones
    );
    let publics = request.public_subnets().count();
    let privates = request.private_subnets().count();
    let _ = writeln!(out, "SUBNETS: {publics} public, {privates} private");
    let _ = write!(
        out,
        "SERVICES: {}",
        request.optimization_hints.preferred_services.join(", ")
    );
    out
}

fn section_line(out: &mut String, label: &str, enabled: bool, items: &[Resource]) {
    if !enabled {
        return;
    }
    if items.is_empty() {
        let _ = writeln!(out, "- {label}");
    } else {
        let names: Vec<&str> = items.iter().map(|r| r.name.as_str()).collect();
        let _ = writeln!(out, "- {label}: {}", names.join(", "));
    }
}

fn yes_no(on: bool) -> &'static str {
    if on {
        "yes"
    } else {
        "no"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{from_text, generate_subnets, normalize};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn cli_prompt_is_byte_identical_across_calls() {
        let request = from_text("서울 리전 2개 AZ에 퍼블릭 프라이빗 서브넷, ec2, rds, s3");
        let target = OutputTarget::new("cloudsketch_test");
        assert_eq!(cli_prompt(&request, &target), cli_prompt(&request, &target));
        assert_eq!(template_prompt(&request), template_prompt(&request));
    }

    #[test]
    fn cli_prompt_carries_target_and_subnets() {
        let request = from_text("서울 vpc 2개 AZ");
        let prompt = cli_prompt(&request, &OutputTarget::new("cloudsketch_x"));
        assert!(prompt.contains("filename=\"cloudsketch_x\""));
        assert!(prompt.contains("- Region: ap-northeast-2"));
        assert!(prompt.contains("public-subnet-b (public, AZ b, 10.0.12.0/24)"));
        assert!(prompt.ends_with("```python block and nothing else."));
    }

    #[test]
    fn template_prompt_round_trips_selection() {
        let request = from_text("도쿄 EC2 4대");
        let prompt = template_prompt(&request);
        assert!(prompt.starts_with("SERVICE: EC2\nCOUNT: 4\n"));
        assert_eq!(
            ServiceSelection::from_prompt(&prompt),
            ServiceSelection::new(ServiceKind::Ec2, 4)
        );
    }

    #[test]
    fn keyword_scan_order_and_count_default() {
        let sel = ServiceSelection::from_prompt("an s3 bucket behind a network");
        assert_eq!(sel, ServiceSelection::new(ServiceKind::S3, 2));
        let sel = ServiceSelection::from_prompt("serverless api, 3 functions");
        assert_eq!(sel, ServiceSelection::new(ServiceKind::Lambda, 3));
        let sel = ServiceSelection::from_prompt("EC2 instances");
        assert_eq!(sel.count, 2);
        let sel = ServiceSelection::from_prompt("kinesis stream");
        assert_eq!(sel.service, ServiceKind::Generic("AWS".to_string()));
    }

    #[test]
    fn no_subnets_listed_without_vpc() {
        let mut request = from_text("lambda api with dynamodb");
        request.networking.vpc.enabled = false;
        request.networking.vpc.subnets = generate_subnets(true, true, 1);
        let prompt = cli_prompt(&request, &OutputTarget::new("cloudsketch_x"));
        assert!(prompt.contains("- VPC: none\n- Internet gateway"));
        assert!(!prompt.contains("subnet-a"));
    }

    #[test]
    fn oversized_model_counts_saturate() {
        let partial = json!({
            "compute": {"ec2": {"enabled": true, "instances": [
                {"count": 4294967295u32},
                {"count": 2}
            ]}}
        });
        let request = normalize("ec2", &partial);
        assert_eq!(request.compute.ec2.total_count(), u32::MAX);
        let prompt = template_prompt(&request);
        assert!(prompt.starts_with("SERVICE: EC2\nCOUNT: 5\n"));
        assert_eq!(ServiceSelection::from_request(&request).count, 5);
    }

    #[test]
    fn count_is_capped() {
        assert_eq!(ServiceSelection::from_prompt("EC2 x 12").count, 5);
    }
}
