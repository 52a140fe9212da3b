//! Catalog for managing relation schemas.

mod descriptor;
mod schema;
mod tuple;

pub use descriptor::AttributeDescriptor;
pub use schema::{AttrDef, AttrInfo, AttributeCatalog, Catalog, RelationSchema};
pub use tuple::{decode_tuple, encode_tuple};
