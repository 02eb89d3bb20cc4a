use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::request::*;
use crate::rules::{self, Field, Inferred};

const ZONE_LETTERS: [&str; 3] = ["a", "b", "c"];

/// Build a complete request from the user's text and whatever partial JSON
/// the model produced. Values present in `partial` win when they have the
/// expected JSON type; everything else comes from keyword heuristics. Never
/// fails: a section that cannot be read falls back to its heuristic value.
pub fn normalize(raw_text: &str, partial: &Value) -> ArchitectureRequest {
    let inferred = Inferred::from_text(raw_text);

    let mut architecture = resolve_section(
        partial,
        "architecture",
        Architecture {
            kind: inferred.architecture_type(),
            complexity: inferred.complexity(),
            region: inferred.text(Field::Region, "us-east-1").to_string(),
            availability_zones: inferred.count(Field::AvailabilityZones, 1),
        },
    );
    architecture.availability_zones = architecture.availability_zones.clamp(1, 3);
    let zones = architecture.availability_zones;

    let networking = resolve_section(partial, "networking", heuristic_networking(&inferred, zones));
    let compute = resolve_section(partial, "compute", heuristic_compute(&inferred, raw_text));
    let database = resolve_section(partial, "database", heuristic_database(&inferred, zones));
    let storage = resolve_section(
        partial,
        "storage",
        Storage {
            s3: S3 {
                enabled: inferred.flag(Field::S3),
                buckets: Vec::new(),
            },
            efs: Efs {
                enabled: inferred.flag(Field::Efs),
                file_systems: Vec::new(),
            },
        },
    );
    let security = resolve_section(partial, "security", Security::default());
    let monitoring = resolve_section(partial, "monitoring", Monitoring::default());
    let optimization_hints = resolve_section(
        partial,
        "optimization_hints",
        OptimizationHints {
            complexity: architecture.complexity,
            preferred_services: rules::mentioned_services(raw_text),
            ..OptimizationHints::default()
        },
    );

    let mut request = ArchitectureRequest {
        request_type: non_empty_str(partial, "request_type").unwrap_or(REQUEST_TYPE).to_string(),
        natural_language_input: non_empty_str(partial, "natural_language_input")
            .unwrap_or(raw_text)
            .to_string(),
        architecture,
        networking,
        compute,
        database,
        storage,
        security,
        monitoring,
        diagram_description: String::new(),
        optimization_hints,
    };
    request.diagram_description = match non_empty_str(partial, "diagram_description") {
        Some(d) => d.to_string(),
        None => describe(&request),
    };

    tracing::debug!(
        region = %request.architecture.region,
        zones,
        kind = request.architecture.kind.as_str(),
        "normalized request"
    );
    request
}

/// Heuristic-only request for when no model output is available.
pub fn from_text(raw_text: &str) -> ArchitectureRequest {
    normalize(raw_text, &Value::Null)
}

/// Subnets for `zones` availability zones. Public and private subnets are
/// interleaved per zone and numbered from 10.0.10.0/24 upwards.
pub fn generate_subnets(public: bool, private: bool, zones: u32) -> Vec<Subnet> {
    let mut subnets = Vec::new();
    let mut third_octet = 10;
    for letter in ZONE_LETTERS.iter().take(zones.clamp(1, 3) as usize) {
        for (wanted, kind) in [(public, SubnetType::Public), (private, SubnetType::Private)] {
            if !wanted {
                continue;
            }
            subnets.push(Subnet {
                kind,
                az: letter.to_string(),
                cidr: format!("10.0.{third_octet}.0/24"),
                name: format!("{}-subnet-{letter}", kind.as_str()),
            });
            third_octet += 1;
        }
    }
    subnets
}

/// One-line Korean summary, e.g. "ap-northeast-2 리전에 1개 AZ를 사용한 AWS 아키텍처, EC2 포함".
pub fn describe(request: &ArchitectureRequest) -> String {
    let arch = &request.architecture;
    let mut description = format!(
        "{} 리전에 {}개 AZ를 사용한 AWS 아키텍처",
        arch.region, arch.availability_zones
    );
    if request.networking.vpc.enabled {
        description.push_str(", VPC 기반");
    }
    let services: Vec<&str> = [
        (request.compute.ec2.enabled, "EC2"),
        (request.database.rds.enabled, "RDS"),
        (request.storage.s3.enabled, "S3"),
    ]
    .into_iter()
    .filter_map(|(on, name)| on.then_some(name))
    .collect();
    if !services.is_empty() {
        description.push_str(&format!(", {} 포함", services.join(", ")));
    }
    description
}

fn heuristic_networking(inferred: &Inferred, zones: u32) -> Networking {
    Networking {
        vpc: Vpc {
            enabled: inferred.flag(Field::Vpc),
            subnets: generate_subnets(
                inferred.flag(Field::PublicSubnets),
                inferred.flag(Field::PrivateSubnets),
                zones,
            ),
            ..Vpc::default()
        },
        internet_gateway: inferred.flag(Field::InternetGateway),
        nat_gateway: inferred.flag(Field::NatGateway),
        load_balancer: LoadBalancer {
            enabled: inferred.flag(Field::LoadBalancer),
            ..LoadBalancer::default()
        },
    }
}

fn heuristic_compute(inferred: &Inferred, raw_text: &str) -> Compute {
    let enabled = inferred.flag(Field::Ec2);
    let mut instances = Vec::new();
    if enabled {
        let count = rules::stated_instance_count(raw_text).unwrap_or(1);
        if inferred.flag(Field::WebServer) {
            instances.push(Ec2Instance {
                name: "web-server".to_string(),
                count,
                ..Ec2Instance::default()
            });
        }
        if inferred.flag(Field::AppServer) {
            instances.push(Ec2Instance {
                name: "app-server".to_string(),
                subnet_type: SubnetType::Private,
                count,
                ..Ec2Instance::default()
            });
        }
        if instances.is_empty() {
            instances.push(Ec2Instance {
                count,
                ..Ec2Instance::default()
            });
        }
    }
    Compute {
        ec2: Ec2 { enabled, instances },
        lambda: Lambda {
            enabled: inferred.flag(Field::Lambda),
            functions: Vec::new(),
        },
        ecs: Ecs {
            enabled: inferred.flag(Field::Ecs),
            services: Vec::new(),
        },
    }
}

fn heuristic_database(inferred: &Inferred, zones: u32) -> Database {
    let enabled = inferred.flag(Field::Rds);
    let engine = inferred.text(Field::DatabaseEngine, "mysql");
    let instances = if enabled {
        vec![RdsInstance {
            engine: engine.to_string(),
            ..RdsInstance::default()
        }]
    } else {
        Vec::new()
    };
    Database {
        rds: Rds {
            enabled,
            engine: engine.to_string(),
            multi_az: zones > 1,
            subnet_type: SubnetType::Private,
            instances,
        },
        dynamodb: DynamoDb {
            enabled: inferred.flag(Field::DynamoDb),
            tables: Vec::new(),
        },
    }
}

fn non_empty_str<'a>(partial: &'a Value, key: &str) -> Option<&'a str> {
    partial
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Overlay `partial[key]` onto the heuristic `base` and read it back.
fn resolve_section<T>(partial: &Value, key: &str, base: T) -> T
where
    T: Serialize + DeserializeOwned,
{
    let Some(overlay) = partial.get(key) else {
        return base;
    };
    let mut merged = match serde_json::to_value(&base) {
        Ok(v) => v,
        Err(_) => return base,
    };
    overlay_value(&mut merged, overlay);
    match serde_json::from_value(merged) {
        Ok(section) => section,
        Err(e) => {
            tracing::warn!(section = key, error = %e, "unreadable section, using heuristics");
            base
        }
    }
}

/// Recursively replace leaves of `base` with those of `overlay` where the
/// JSON kinds agree. Nulls and kind mismatches keep the base value.
fn overlay_value(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(over_map)) => {
            for (k, v) in over_map {
                match base_map.get_mut(k) {
                    Some(existing) => overlay_value(existing, v),
                    None if !v.is_null() => {
                        base_map.insert(k.clone(), v.clone());
                    }
                    None => {}
                }
            }
        }
        (slot @ Value::Array(_), v @ Value::Array(_))
        | (slot @ Value::String(_), v @ Value::String(_))
        | (slot @ Value::Bool(_), v @ Value::Bool(_))
        | (slot @ Value::Number(_), v @ Value::Number(_)) => {
            *slot = v.clone();
        }
        _ => {}
    }
}
