use indexmap::IndexMap;
use log::info;
use serde_json::{Map, Value};

use super::travis::Travis;
use super::{Service, ServiceSettings};
use crate::error::{FlashError, Result};

pub type ServiceMap = IndexMap<String, Box<dyn Service>>;

type Constructor = fn(&ServiceSettings) -> Result<Box<dyn Service>>;

const SERVICES: &[(&str, Constructor)] = &[("travis", travis), ("travis-pro", travis_pro)];

fn travis(settings: &ServiceSettings) -> Result<Box<dyn Service>> {
    Ok(Box::new(Travis::open_source(settings)?))
}

fn travis_pro(settings: &ServiceSettings) -> Result<Box<dyn Service>> {
    Ok(Box::new(Travis::pro(settings)?))
}

fn entry_str<'a>(entry: &'a Map<String, Value>, key: &str, index: usize) -> Result<&'a str> {
    entry
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| FlashError::Config(format!("service #{index} has no '{key}'")))
}

/// Build the configured services, keyed by name in configuration order.
pub fn define_services(entries: &[Map<String, Value>]) -> Result<ServiceMap> {
    let mut services = ServiceMap::with_capacity(entries.len());

    for (index, entry) in entries.iter().enumerate() {
        let name = entry_str(entry, "name", index)?;
        let kind = entry_str(entry, "type", index)?;

        if services.contains_key(name) {
            return Err(FlashError::Config(format!("duplicate service name '{name}'")));
        }

        let (_, constructor) = SERVICES
            .iter()
            .find(|(known, _)| *known == kind)
            .ok_or_else(|| {
                FlashError::Config(format!("unknown service type '{kind}' for '{name}'"))
            })?;

        let mut fields = entry.clone();
        fields.remove("name");
        fields.remove("type");

        let service = constructor(&ServiceSettings::new(name, fields))?;
        info!(
            "Configured service '{name}' ({kind}, template '{}')",
            service.template()
        );
        services.insert(name.to_string(), service);
    }

    Ok(services)
}
