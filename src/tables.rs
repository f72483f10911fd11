use std::collections::BTreeSet;

use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    device::DeviceInfo,
    entity::Sensor,
    sunspec::{Catalog, Value},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_sensors_table<'a>(
    states: impl IntoIterator<Item = (&'a Sensor, Option<Value>)>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Name", "State", "Unit", "Class", "State class", "Key"]);
    for (sensor, state) in states {
        let state_cell = match state {
            Some(value) => Cell::new(value).set_alignment(CellAlignment::Right).fg(
                if sensor.is_assumed() { Color::DarkYellow } else { Color::Reset },
            ),
            None => Cell::new("unknown").add_attribute(Attribute::Dim),
        };
        table.add_row(vec![
            Cell::new(&sensor.name),
            state_cell,
            Cell::new(sensor.unit.as_deref().unwrap_or_default()),
            Cell::new(sensor.device_class.map(|class| class.to_string()).unwrap_or_default())
                .add_attribute(Attribute::Dim),
            Cell::new(sensor.state_class().map(|class| class.to_string()).unwrap_or_default())
                .add_attribute(Attribute::Dim),
            Cell::new(format!("{}/{}#{}", sensor.model_id, sensor.key, sensor.model_index))
                .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_models_table(
    advertised: &[u16],
    enabled_models: &BTreeSet<u16>,
    catalog: &Catalog,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Model", "Name", "Label", "Enabled"]);
    for id in advertised {
        let definition = catalog.get_or_opaque(*id);
        let is_enabled = enabled_models.contains(id);
        table.add_row(vec![
            Cell::new(id).set_alignment(CellAlignment::Right),
            Cell::new(&definition.group.name)
                .fg(if definition.is_opaque() { Color::DarkGrey } else { Color::Reset }),
            Cell::new(definition.group.label.as_deref().unwrap_or_default()),
            Cell::new(if is_enabled { "yes" } else { "no" })
                .fg(if is_enabled { Color::Green } else { Color::Reset }),
        ]);
    }
    table
}

pub fn build_device_table(info: &DeviceInfo) -> Table {
    let mut table = new_table();
    for (name, value) in [
        ("Manufacturer", &info.manufacturer),
        ("Model", &info.model),
        ("Version", &info.version),
        ("Serial number", &info.serial_number),
    ] {
        table.add_row(vec![
            Cell::new(name).add_attribute(Attribute::Bold),
            Cell::new(value.as_deref().unwrap_or("unknown")),
        ]);
    }
    table
}
