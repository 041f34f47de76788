/// Option model: declaration, argv parsing and validation.
pub mod errors;
pub mod parser;
pub mod registry;
pub mod spec;
pub mod validate;

pub use errors::{ParseError, RegistryError, ValidationError};
pub use parser::{ArgvParser, OptionValue, ParsedInput, ParsedOptions, ParsedValue};
pub use registry::{BATCH_SIZE, OptionRegistry};
pub use spec::{OptionGroup, OptionSpec, PositionalSpec};
pub use validate::validate;
