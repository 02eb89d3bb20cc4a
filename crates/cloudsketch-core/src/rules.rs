//! Keyword heuristics as one ordered rule table.
//!
//! Each field is resolved by the first rule (in table order) whose predicate
//! matches the lower-cased request text. Every field ends with an `Always`
//! rule, so every field resolves.

use std::collections::HashMap;

use crate::request::{ArchitectureType, Complexity};

#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    /// Any of the keywords appears.
    Any(&'static [&'static str]),
    /// Some keyword from every group appears.
    All(&'static [&'static [&'static str]]),
    Always,
}

impl Predicate {
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Predicate::Any(words) => words.iter().any(|w| text.contains(w)),
            Predicate::All(groups) => groups
                .iter()
                .all(|group| group.iter().any(|w| text.contains(w))),
            Predicate::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ArchitectureType,
    Complexity,
    Region,
    AvailabilityZones,
    DatabaseEngine,
    Vpc,
    InternetGateway,
    NatGateway,
    LoadBalancer,
    Ec2,
    Lambda,
    Ecs,
    Rds,
    DynamoDb,
    S3,
    Efs,
    PublicSubnets,
    PrivateSubnets,
    WebServer,
    AppServer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    Kind(ArchitectureType),
    Complexity(Complexity),
    Text(&'static str),
    Count(u32),
    Flag(bool),
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub field: Field,
    pub when: Predicate,
    pub value: Value,
}

const fn rule(field: Field, when: Predicate, value: Value) -> Rule {
    Rule { field, when, value }
}

use Field as F;
use Predicate::{All, Always, Any};
use Value::{Count, Flag, Text};

const VPC_WORDS: &[&str] = &["vpc", "서브넷", "subnet", "네트워크"];
const SERVERLESS_WORDS: &[&str] = &["lambda", "서버리스", "serverless"];
const CONTAINER_WORDS: &[&str] = &["container", "ecs", "fargate", "컨테이너"];
const PUBLIC_WORDS: &[&str] = &["퍼블릭", "public"];
const PRIVATE_WORDS: &[&str] = &["프라이빗", "private"];

pub const RULES: &[Rule] = &[
    // architecture type
    rule(F::ArchitectureType, Any(VPC_WORDS), Value::Kind(ArchitectureType::Vpc)),
    rule(F::ArchitectureType, Any(SERVERLESS_WORDS), Value::Kind(ArchitectureType::Serverless)),
    rule(F::ArchitectureType, Any(CONTAINER_WORDS), Value::Kind(ArchitectureType::Container)),
    rule(F::ArchitectureType, Always, Value::Kind(ArchitectureType::Simple)),
    // complexity: complex indicators win over simple ones
    rule(
        F::Complexity,
        Any(&["multi", "여러", "다중", "고가용성", "로드밸런서", "오토스케일링"]),
        Value::Complexity(Complexity::Complex),
    ),
    rule(
        F::Complexity,
        Any(&["간단", "simple", "기본", "테스트"]),
        Value::Complexity(Complexity::Simple),
    ),
    rule(F::Complexity, Always, Value::Complexity(Complexity::Medium)),
    // region
    rule(F::Region, Any(&["오사카", "osaka"]), Text("ap-northeast-3")),
    rule(F::Region, Any(&["도쿄", "tokyo"]), Text("ap-northeast-1")),
    rule(F::Region, Any(&["서울", "seoul"]), Text("ap-northeast-2")),
    rule(F::Region, Any(&["버지니아", "virginia"]), Text("us-east-1")),
    rule(F::Region, Any(&["오레곤", "oregon"]), Text("us-west-2")),
    rule(F::Region, Always, Text("us-east-1")),
    // availability zones
    rule(F::AvailabilityZones, Any(&["2개", "두개", "2 az"]), Count(2)),
    rule(F::AvailabilityZones, Any(&["3개", "세개", "3 az"]), Count(3)),
    rule(F::AvailabilityZones, Any(&["고가용성", "multi-az", "다중"]), Count(2)),
    rule(F::AvailabilityZones, Always, Count(1)),
    // database engine
    rule(F::DatabaseEngine, Any(&["mysql"]), Text("mysql")),
    rule(F::DatabaseEngine, Any(&["postgresql", "postgres"]), Text("postgresql")),
    rule(F::DatabaseEngine, Any(&["oracle"]), Text("oracle")),
    rule(F::DatabaseEngine, Any(&["sqlserver", "sql server"]), Text("sqlserver")),
    rule(F::DatabaseEngine, Always, Text("mysql")),
    // networking
    rule(
        F::Vpc,
        Any(&["vpc", "서브넷", "subnet", "네트워크", "프라이빗", "퍼블릭"]),
        Flag(true),
    ),
    rule(F::Vpc, Always, Flag(false)),
    rule(
        F::InternetGateway,
        Any(&["퍼블릭", "public", "인터넷", "internet", "웹"]),
        Flag(true),
    ),
    rule(F::InternetGateway, Always, Flag(false)),
    rule(F::NatGateway, All(&[&["프라이빗"], PUBLIC_WORDS]), Flag(true)),
    rule(F::NatGateway, Always, Flag(false)),
    rule(
        F::LoadBalancer,
        Any(&["로드밸런서", "load balancer", "alb", "elb", "분산"]),
        Flag(true),
    ),
    rule(F::LoadBalancer, Always, Flag(false)),
    // subnets: both kinds when neither is mentioned
    rule(F::PublicSubnets, Any(PUBLIC_WORDS), Flag(true)),
    rule(F::PublicSubnets, Any(PRIVATE_WORDS), Flag(false)),
    rule(F::PublicSubnets, Always, Flag(true)),
    rule(F::PrivateSubnets, Any(PRIVATE_WORDS), Flag(true)),
    rule(F::PrivateSubnets, Any(PUBLIC_WORDS), Flag(false)),
    rule(F::PrivateSubnets, Always, Flag(true)),
    // compute
    rule(
        F::Ec2,
        Any(&["ec2", "인스턴스", "instance", "서버", "server"]),
        Flag(true),
    ),
    rule(F::Ec2, Always, Flag(false)),
    rule(F::WebServer, All(&[&["퍼블릭"], &["ec2"]]), Flag(true)),
    rule(F::WebServer, Always, Flag(false)),
    rule(F::AppServer, All(&[&["프라이빗"], &["ec2"]]), Flag(true)),
    rule(F::AppServer, Always, Flag(false)),
    rule(
        F::Lambda,
        Any(&["lambda", "람다", "서버리스", "serverless", "함수"]),
        Flag(true),
    ),
    rule(F::Lambda, Always, Flag(false)),
    rule(
        F::Ecs,
        Any(&["ecs", "fargate", "컨테이너", "container", "docker"]),
        Flag(true),
    ),
    rule(F::Ecs, Always, Flag(false)),
    // data
    rule(
        F::Rds,
        Any(&["rds", "mysql", "postgresql", "oracle", "데이터베이스", "database", "db"]),
        Flag(true),
    ),
    rule(F::Rds, Always, Flag(false)),
    rule(F::DynamoDb, Any(&["dynamodb", "다이나모", "nosql"]), Flag(true)),
    rule(F::DynamoDb, Always, Flag(false)),
    rule(
        F::S3,
        Any(&["s3", "스토리지", "storage", "버킷", "bucket", "파일"]),
        Flag(true),
    ),
    rule(F::S3, Always, Flag(false)),
    rule(F::Efs, Any(&["efs", "파일시스템", "file system", "공유"]), Flag(true)),
    rule(F::Efs, Always, Flag(false)),
];

/// Keyword groups for the `preferred_services` hint, in reporting order.
pub const SERVICE_MENTIONS: &[(&str, &[&str])] = &[
    ("EC2", &["ec2", "인스턴스", "instance"]),
    ("RDS", &["rds", "mysql", "postgresql", "데이터베이스"]),
    ("S3", &["s3", "스토리지", "버킷"]),
    ("LAMBDA", &["lambda", "람다", "서버리스"]),
    ("VPC", &["vpc", "네트워크"]),
    ("ELB", &["로드밸런서", "load balancer", "alb", "elb"]),
];

/// Field values resolved from one piece of text.
#[derive(Debug, Clone)]
pub struct Inferred {
    values: HashMap<Field, Value>,
}

impl Inferred {
    /// Evaluate `rules` once against `text`, keeping the first match per field.
    pub fn evaluate(text: &str, rules: &[Rule]) -> Self {
        let text = text.to_lowercase();
        let mut values = HashMap::new();
        for r in rules {
            if values.contains_key(&r.field) {
                continue;
            }
            if r.when.matches(&text) {
                values.insert(r.field, r.value);
            }
        }
        Self { values }
    }

    pub fn from_text(text: &str) -> Self {
        Self::evaluate(text, RULES)
    }

    pub fn get(&self, field: Field) -> Option<Value> {
        self.values.get(&field).copied()
    }

    pub fn flag(&self, field: Field) -> bool {
        matches!(self.get(field), Some(Flag(true)))
    }

    pub fn text(&self, field: Field, fallback: &'static str) -> &'static str {
        match self.get(field) {
            Some(Text(t)) => t,
            _ => fallback,
        }
    }

    pub fn count(&self, field: Field, fallback: u32) -> u32 {
        match self.get(field) {
            Some(Count(n)) => n,
            _ => fallback,
        }
    }

    pub fn architecture_type(&self) -> ArchitectureType {
        match self.get(F::ArchitectureType) {
            Some(Value::Kind(k)) => k,
            _ => ArchitectureType::default(),
        }
    }

    pub fn complexity(&self) -> Complexity {
        match self.get(F::Complexity) {
            Some(Value::Complexity(c)) => c,
            _ => Complexity::default(),
        }
    }
}

/// Upper-case service names mentioned in `text`.
pub fn mentioned_services(text: &str) -> Vec<String> {
    let text = text.to_lowercase();
    SERVICE_MENTIONS
        .iter()
        .filter(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Instance count stated with Arabic digits ("3대", "2 servers"), capped at 5.
/// Korean number words are not recognized.
pub fn stated_instance_count(text: &str) -> Option<u32> {
    const COUNTERS: &[&str] = &["대", "instances", "instance", "servers", "server"];
    let lower = text.to_lowercase();
    let mut pos = 0;
    while let Some(offset) = lower[pos..].find(|c: char| c.is_ascii_digit()) {
        let start = pos + offset;
        let end = lower[start..]
            .find(|c: char| !c.is_ascii_digit())
            .map_or(lower.len(), |i| start + i);
        // digits glued to a word ("ec2") are part of a name
        let glued = lower[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '.');
        let after = lower[end..].trim_start();
        if !glued && COUNTERS.iter().any(|c| after.starts_with(c)) {
            if let Ok(n) = lower[start..end].parse::<u32>() {
                if n > 0 {
                    return Some(n.min(5));
                }
            }
        }
        pos = end;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_resolves_for_empty_text() {
        let inferred = Inferred::from_text("");
        for r in RULES {
            assert!(inferred.get(r.field).is_some(), "{:?} unresolved", r.field);
        }
        assert_eq!(inferred.text(F::Region, ""), "us-east-1");
        assert_eq!(inferred.count(F::AvailabilityZones, 0), 1);
    }

    #[test]
    fn complex_indicator_beats_simple() {
        let inferred = Inferred::from_text("simple 고가용성 웹 서비스");
        assert_eq!(inferred.complexity(), Complexity::Complex);
        assert_eq!(Inferred::from_text("간단한 테스트").complexity(), Complexity::Simple);
        assert_eq!(Inferred::from_text("web app").complexity(), Complexity::Medium);
    }

    #[test]
    fn first_matching_rule_wins_within_a_field() {
        let rules = [
            rule(F::Region, Any(&["seoul"]), Text("first")),
            rule(F::Region, Any(&["seoul"]), Text("second")),
            rule(F::Region, Always, Text("fallback")),
        ];
        let inferred = Inferred::evaluate("Seoul", &rules);
        assert_eq!(inferred.text(F::Region, ""), "first");
        assert_eq!(Inferred::evaluate("busan", &rules).text(F::Region, ""), "fallback");
    }

    #[test]
    fn osaka_checked_before_seoul() {
        let inferred = Inferred::from_text("서울과 오사카");
        assert_eq!(inferred.text(F::Region, ""), "ap-northeast-3");
    }

    #[test]
    fn nat_requires_private_and_public() {
        assert!(Inferred::from_text("퍼블릭 프라이빗 서브넷").flag(F::NatGateway));
        assert!(!Inferred::from_text("프라이빗 서브넷").flag(F::NatGateway));
    }

    #[test]
    fn subnet_kinds_default_to_both() {
        let both = Inferred::from_text("vpc");
        assert!(both.flag(F::PublicSubnets) && both.flag(F::PrivateSubnets));
        let private = Inferred::from_text("private subnet");
        assert!(!private.flag(F::PublicSubnets) && private.flag(F::PrivateSubnets));
    }

    #[test]
    fn instance_count_needs_arabic_digits() {
        assert_eq!(stated_instance_count("EC2 3대"), Some(3));
        assert_eq!(stated_instance_count("ec2 2 instances in 2 az"), Some(2));
        assert_eq!(stated_instance_count("EC2 9대"), Some(5));
        assert_eq!(stated_instance_count("EC2 두 대"), None);
        assert_eq!(stated_instance_count("EC2 instance"), None);
        assert_eq!(stated_instance_count("2개 AZ에 EC2"), None);
        assert_eq!(stated_instance_count("EC2 3개"), None);
        assert_eq!(stated_instance_count("10.0.0.0/16"), None);
    }

    #[test]
    fn mentioned_services_in_order() {
        assert_eq!(
            mentioned_services("S3 버킷과 EC2, 로드밸런서"),
            vec!["EC2".to_string(), "S3".to_string(), "ELB".to_string()]
        );
    }
}
