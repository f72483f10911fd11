use crate::{
    modbus::{DeviceError, Transport},
    prelude::*,
    sunspec::{Catalog, ModelInstance, Models},
};

/// Addresses checked for the SunSpec marker, in order.
pub const BASE_ADDRESSES: [u16; 3] = [40000, 0, 50000];

/// `SunS` in ASCII.
const MARKER: [u16; 2] = [0x5375, 0x6E53];

const END_OF_MAP: u16 = 0xFFFF;

/// Discover the models advertised by the device.
#[instrument(skip_all, name = "scan")]
pub async fn scan<T: Transport>(
    transport: &mut T,
    catalog: &Catalog,
) -> Result<Models, DeviceError> {
    let base = find_base(transport).await?;
    info!(base, "found the SunSpec marker");

    let mut models = Models::new();
    let mut address = base.checked_add(2);
    while let Some(header_address) = address {
        let header = match transport.read_range(header_address, 2).await {
            Ok(header) => header,
            Err(error) if !error.is_timeout() && transport.is_connected() => {
                warn!(header_address, "failed to read the model header, assuming the end: {error}");
                break;
            }
            Err(error) => return Err(error),
        };
        let (id, length) = (header[0], header[1]);
        if id == END_OF_MAP {
            break;
        }
        let definition = catalog.get_or_opaque(id);
        if definition.is_opaque() {
            debug!(id, header_address, length, "unknown model");
        } else {
            debug!(id, header_address, length, "found model");
        }
        models.entry(id).or_default().push(ModelInstance::new(definition, header_address, length));
        address = header_address.checked_add(length).and_then(|address| address.checked_add(2));
    }

    info!(n_models = models.values().map(Vec::len).sum::<usize>(), "scanned");
    Ok(models)
}

async fn find_base<T: Transport>(transport: &mut T) -> Result<u16, DeviceError> {
    for base in BASE_ADDRESSES {
        match transport.read_range(base, 2).await {
            Ok(words) if words == MARKER => return Ok(base),
            Ok(words) => debug!(base, ?words, "no marker"),
            Err(error) if !error.is_timeout() && transport.is_connected() => {
                debug!(base, "failed to read the marker: {error}");
            }
            Err(error) => return Err(error),
        }
    }
    Err(DeviceError::connection("SunSpec marker is not found"))
}
