use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use once_cell::sync::Lazy;

use super::{
    DeviceControl, DeviceDescriptor, DeviceError, DeviceKind, MicrobitControl, Result, WiseXboardControl,
    WiseXboardPremiumControl,
};
use crate::config::LinkConfig;
use crate::serial::{self, PortInfo, SerialLink};

static REGISTRY: Lazy<HashMap<&'static str, &'static DeviceDescriptor>> = Lazy::new(|| {
    DeviceKind::ALL
        .into_iter()
        .map(|kind| {
            let descriptor = kind.descriptor();
            (descriptor.id, descriptor)
        })
        .collect()
});

/// Every supported board family, keyed by id.
pub fn registry() -> &'static HashMap<&'static str, &'static DeviceDescriptor> {
    &REGISTRY
}

pub fn lookup(id: &str) -> Result<&'static DeviceDescriptor> {
    REGISTRY
        .get(id)
        .copied()
        .ok_or_else(|| DeviceError::UnknownDevice(id.to_string()))
}

/// Wrap `link` in the control surface of `kind`.
pub fn create_control(kind: DeviceKind, link: Arc<SerialLink>) -> Box<dyn DeviceControl> {
    match kind {
        DeviceKind::Microbit => Box::new(MicrobitControl::new(link)),
        DeviceKind::WiseXboard => Box::new(WiseXboardControl::new(link)),
        DeviceKind::WiseXboardPremium => Box::new(WiseXboardPremiumControl::new(link)),
    }
}

pub fn match_port<'a>(descriptor: &DeviceDescriptor, ports: &'a [PortInfo]) -> Option<&'a PortInfo> {
    ports.iter().find(|port| descriptor.is_match(port))
}

/// First attached port whose USB bridge matches `descriptor`.
pub fn find_first_port(descriptor: &DeviceDescriptor) -> Result<Option<PortInfo>> {
    let ports = serial::available_ports()?;
    debug!("Scanning {} ports for {}", ports.len(), descriptor.id);
    Ok(match_port(descriptor, &ports).cloned())
}

/// Open `path` as a `kind` board and return its control surface.
pub fn open_device(kind: DeviceKind, path: &str, config: LinkConfig) -> Result<Box<dyn DeviceControl>> {
    config.validate()?;
    let link = Arc::new(kind.descriptor().link(path, config));
    link.open()?;
    info!("Opened {} on {}", kind, path);
    Ok(create_control(kind, link))
}
