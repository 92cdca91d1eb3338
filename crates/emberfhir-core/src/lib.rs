pub mod element;
pub mod error;
pub mod fhir;
pub mod reference;
pub mod service_base_url;
pub mod time;

pub use element::Element;
pub use error::{CoreError, Result};
pub use fhir::ResourceType;
pub use reference::{ReferenceIdentity, ReferenceTarget, UnindexableReference, parse_reference};
pub use service_base_url::{MemoryServiceBaseUrlRegistry, ServiceBaseUrl, ServiceBaseUrlRegistry};
pub use time::{DatePrecision, FhirDateTime};
