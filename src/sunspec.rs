//! SunSpec information model: definitions, discovery and the flattened model view.

mod catalog;
mod definition;
mod key;
mod model;
mod point;
mod scan;
mod value;
mod wrapper;

pub use self::{
    catalog::Catalog,
    definition::{
        DataType,
        DefinitionError,
        GroupCount,
        GroupDefinition,
        ModelDefinition,
        PointDefinition,
        PointKind,
        ScaleFactor,
    },
    key::PointKey,
    model::{ModelInstance, Models},
    point::{Point, PointError, Scale},
    scan::scan,
    value::{RawValue, Value},
    wrapper::ModelWrapper,
};

/// The common model every SunSpec device starts with.
pub const COMMON_MODEL_ID: u16 = 1;
