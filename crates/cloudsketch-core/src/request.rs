use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Enumerations ---

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ArchitectureType {
    Vpc,
    Serverless,
    Container,
    Hybrid,
    #[default]
    Simple,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    #[default]
    Medium,
    Complex,
}

impl Complexity {
    pub fn as_str(self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Medium => "medium",
            Complexity::Complex => "complex",
        }
    }
}

impl ArchitectureType {
    pub fn as_str(self) -> &'static str {
        match self {
            ArchitectureType::Vpc => "vpc",
            ArchitectureType::Serverless => "serverless",
            ArchitectureType::Container => "container",
            ArchitectureType::Hybrid => "hybrid",
            ArchitectureType::Simple => "simple",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SubnetType {
    #[default]
    Public,
    Private,
}

impl SubnetType {
    pub fn as_str(self) -> &'static str {
        match self {
            SubnetType::Public => "public",
            SubnetType::Private => "private",
        }
    }
}

// --- Request sections ---

/// A fully-described architecture request. Every section carries defaults so a
/// normalized value can be read without further checks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct ArchitectureRequest {
    pub request_type: String,
    /// The user's original wording
    pub natural_language_input: String,
    pub architecture: Architecture,
    pub networking: Networking,
    pub compute: Compute,
    pub database: Database,
    pub storage: Storage,
    pub security: Security,
    pub monitoring: Monitoring,
    /// One-line summary used as the diagram title
    pub diagram_description: String,
    pub optimization_hints: OptimizationHints,
}

pub const REQUEST_TYPE: &str = "AWS Architecture Request for Amazon Q CLI";

/// Top-level keys every normalized request carries.
pub const REQUIRED_SECTIONS: [&str; 7] = [
    "architecture",
    "networking",
    "compute",
    "database",
    "storage",
    "security",
    "monitoring",
];

impl Default for ArchitectureRequest {
    fn default() -> Self {
        Self {
            request_type: REQUEST_TYPE.to_string(),
            natural_language_input: String::new(),
            architecture: Architecture::default(),
            networking: Networking::default(),
            compute: Compute::default(),
            database: Database::default(),
            storage: Storage::default(),
            security: Security::default(),
            monitoring: Monitoring::default(),
            diagram_description: String::new(),
            optimization_hints: OptimizationHints::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Architecture {
    #[serde(rename = "type")]
    pub kind: ArchitectureType,
    pub complexity: Complexity,
    /// AWS region code, e.g. "ap-northeast-2"
    pub region: String,
    /// Number of availability zones (1 to 3)
    pub availability_zones: u32,
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            kind: ArchitectureType::default(),
            complexity: Complexity::default(),
            region: "us-east-1".to_string(),
            availability_zones: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Networking {
    pub vpc: Vpc,
    pub internet_gateway: bool,
    pub nat_gateway: bool,
    pub load_balancer: LoadBalancer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Vpc {
    pub enabled: bool,
    pub cidr: String,
    pub subnets: Vec<Subnet>,
}

impl Default for Vpc {
    fn default() -> Self {
        Self {
            enabled: false,
            cidr: "10.0.0.0/16".to_string(),
            subnets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(default)]
pub struct Subnet {
    #[serde(rename = "type")]
    pub kind: SubnetType,
    /// Zone letter: "a", "b" or "c"
    pub az: String,
    pub cidr: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct LoadBalancer {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for LoadBalancer {
    fn default() -> Self {
        Self {
            enabled: false,
            kind: "application".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Compute {
    pub ec2: Ec2,
    pub lambda: Lambda,
    pub ecs: Ecs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Ec2 {
    pub enabled: bool,
    pub instances: Vec<Ec2Instance>,
}

impl Ec2 {
    /// Total instance count across all instance groups. Saturates, since
    /// counts may come straight from model output.
    pub fn total_count(&self) -> u32 {
        self.instances
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.count.max(1)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct Ec2Instance {
    pub name: String,
    #[serde(rename = "type")]
    pub instance_type: String,
    pub subnet_type: SubnetType,
    pub az: String,
    pub count: u32,
}

impl Default for Ec2Instance {
    fn default() -> Self {
        Self {
            name: "ec2-instance".to_string(),
            instance_type: "t3.micro".to_string(),
            subnet_type: SubnetType::Public,
            az: "a".to_string(),
            count: 1,
        }
    }
}

/// A named resource inside a service (function, table, bucket, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(default)]
pub struct Resource {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Lambda {
    pub enabled: bool,
    pub functions: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Ecs {
    pub enabled: bool,
    pub services: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Database {
    pub rds: Rds,
    pub dynamodb: DynamoDb,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(default)]
pub struct Rds {
    pub enabled: bool,
    /// mysql, postgresql, oracle or sqlserver
    pub engine: String,
    pub multi_az: bool,
    pub subnet_type: SubnetType,
    pub instances: Vec<RdsInstance>,
}

impl Default for Rds {
    fn default() -> Self {
        Self {
            enabled: false,
            engine: "mysql".to_string(),
            multi_az: false,
            subnet_type: SubnetType::Private,
            instances: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct RdsInstance {
    pub name: String,
    pub engine: String,
    pub instance_class: String,
    pub az: String,
}

impl Default for RdsInstance {
    fn default() -> Self {
        Self {
            name: "main-database".to_string(),
            engine: "mysql".to_string(),
            instance_class: "db.t3.micro".to_string(),
            az: "a".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct DynamoDb {
    pub enabled: bool,
    pub tables: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Storage {
    pub s3: S3,
    pub efs: Efs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct S3 {
    pub enabled: bool,
    pub buckets: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema)]
#[serde(default)]
pub struct Efs {
    pub enabled: bool,
    pub file_systems: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct Security {
    pub security_groups: bool,
    pub nacl: bool,
    pub waf: bool,
    pub cloudtrail: bool,
}

impl Default for Security {
    fn default() -> Self {
        Self {
            security_groups: true,
            nacl: false,
            waf: false,
            cloudtrail: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct Monitoring {
    pub cloudwatch: bool,
    pub cloudtrail: bool,
    pub x_ray: bool,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            cloudwatch: true,
            cloudtrail: false,
            x_ray: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct OptimizationHints {
    pub complexity: Complexity,
    pub focus_areas: Vec<String>,
    /// Upper-case service names mentioned by the user, e.g. "EC2"
    pub preferred_services: Vec<String>,
    pub exclude_security: bool,
    pub fast_generation: bool,
}

impl Default for OptimizationHints {
    fn default() -> Self {
        Self {
            complexity: Complexity::default(),
            focus_areas: vec!["고가용성".to_string(), "성능".to_string()],
            preferred_services: Vec::new(),
            exclude_security: false,
            fast_generation: true,
        }
    }
}

impl ArchitectureRequest {
    /// The primary service this request is about, used for coarse template
    /// selection and static fallback labels.
    pub fn primary_service(&self) -> &'static str {
        if self.compute.ec2.enabled {
            "EC2"
        } else if self.compute.lambda.enabled {
            "LAMBDA"
        } else if self.database.rds.enabled {
            "RDS"
        } else if self.storage.s3.enabled {
            "S3"
        } else if self.networking.vpc.enabled {
            "VPC"
        } else {
            "AWS"
        }
    }

    pub fn public_subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.networking
            .vpc
            .subnets
            .iter()
            .filter(|s| s.kind == SubnetType::Public)
    }

    pub fn private_subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.networking
            .vpc
            .subnets
            .iter()
            .filter(|s| s.kind == SubnetType::Private)
    }
}
