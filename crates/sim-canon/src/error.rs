#[derive(Debug, thiserror::Error)]
pub enum EncodingError {
    #[error("value of type '{type_name}' is not serializable for canonicalization")]
    NonSerializable {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
}
