#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport failure fetching {url}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode search page from {url}")]
    DecodePage {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid page url {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid percent-encoding in next page url {url}")]
    DecodeNextUrl {
        url: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("could not create or update package {name}")]
    InconsistentUpsert { name: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Unknown(#[from] anyhow::Error),
}
