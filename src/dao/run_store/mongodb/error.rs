use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failures raised by the MongoDB run store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// Required environment variable is absent.
    #[error("missing environment variable `{var}`")]
    MissingEnvVar {
        /// Name of the variable.
        var: &'static str,
    },
    /// Connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Offending URI.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Client could not be built from the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Server never answered the startup ping.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Number of pings attempted.
        attempts: u32,
        /// Last driver error.
        #[source]
        source: MongoError,
    },
    /// Health ping failed on an established connection.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Index creation failed at startup.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Target collection.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A write failed.
    #[error("failed to save {entity} `{id}`")]
    Save {
        /// Kind of entity written.
        entity: &'static str,
        /// Identifier of the entity.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A point lookup failed.
    #[error("failed to load {entity} `{id}`")]
    Load {
        /// Kind of entity read.
        entity: &'static str,
        /// Identifier of the entity.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A multi-document query failed.
    #[error("failed to query {collection}")]
    Query {
        /// Collection being queried.
        collection: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A delete failed.
    #[error("failed to delete participation `{id}`")]
    DeleteParticipation {
        /// Record identifier.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
