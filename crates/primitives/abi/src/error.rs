/// Errors raised while converting between JSON values and ABI values.
///
/// The `path` carried by most variants identifies the offending parameter,
/// e.g. `Method 'transfer' param 0.recipient`, so the REST layer can surface
/// the message verbatim.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("{path}: Must supply a number or a string")]
    NotNumber { path: String },
    #[error("{path}: Could not be converted to a number")]
    BadNumber { path: String },
    #[error("{path}: Supplied number is outside of range for {ty}")]
    NumberOutOfRange { path: String, ty: String },
    #[error("{path}: Must supply a boolean or a string")]
    NotBool { path: String },
    #[error("{path}: Must supply a string")]
    NotString { path: String },
    #[error("{path}: Must supply a hex address string")]
    NotAddress { path: String },
    #[error("{path}: Could not be converted to a hex address")]
    BadAddress { path: String },
    #[error("{path}: Must supply a hex string")]
    NotHex { path: String },
    #[error("{path}: Could not be converted to hex bytes")]
    BadHex { path: String },
    #[error("{path}: Hex value is the wrong length for {ty} (supplied={got} bytes)")]
    FixedBytesLength { path: String, ty: String, got: usize },
    #[error("{path}: Must supply an array")]
    NotArray { path: String },
    #[error("{path}: Must supply an array of {want} elements (supplied={got})")]
    FixedArrayLength { path: String, want: usize, got: usize },
    #[error("{path}: Supplied value {value} outside of range for byte")]
    ByteOutOfRange { path: String, value: String },
    #[error("{path}: Invalid entry in number array")]
    BadByteEntry { path: String },
    #[error("{path}: Must supply an object (supplied={supplied})")]
    NotObject { path: String, supplied: String },
    #[error("{path}: supplied value could not be assigned to '{field}' field ({ty})")]
    TupleFieldMissing { path: String, field: String, ty: String },
    #[error("{path}: Cannot supply a null value")]
    NullValue { path: String },
    #[error("Type '{ty}' is not yet supported")]
    TypeNotSupported { ty: String },
    #[error("{path}: supplied as an object must have 'type' and 'value' fields")]
    InlineMissingTypeValue { path: String },
    #[error("{path}: supplied as an object must be string")]
    InlineTypeNotString { path: String },
    #[error("{path}: Unable to map {ty} to ethereum type")]
    InlineBadType { path: String, ty: String },
    #[error("{method}: Requires {want} args (supplied={got})")]
    ArgCountMismatch { method: String, want: usize, got: usize },
    #[error("Expected {want} in JSON/RPC response. Received {got}")]
    OutputCountMismatch { want: usize, got: usize },
    #[error("Expected no return values in JSON/RPC response. Received 0x{data}")]
    UnexpectedReturnData { data: String },
    #[error("Failed to unpack values from JSON/RPC response: {0}")]
    Unpack(String),
    #[error("Method signature did not match")]
    SignatureMismatch,
}
