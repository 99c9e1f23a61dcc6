pub mod archive;
pub mod config;
pub mod courier;
pub mod credentials;
pub mod heartbeat;
pub mod routing;
pub mod testing;
pub mod transfer;
pub mod watcher;

pub use archive::{ArchiveConfig, ArchiveError, Archiver, FsArchiver};
pub use config::{
    load_config, load_config_from_str, validate_config, CertificateConfig, Config, ConfigError,
    EndpointConfig, RoutingDefaults, SanitizedConfig, WatcherConfig,
};
pub use courier::{Courier, CourierError, CourierStats, FileDisposition};
pub use credentials::{
    create_certificate_provider, CertificateProvider, ClientCredential, CredentialError,
    DirectoryCertificateStore,
};
pub use heartbeat::{HeartbeatConfig, HeartbeatStatus, HeartbeatTicker};
pub use routing::{MetadataResolver, PathLayout, ResolveError, RoutingDescriptor, RoutingSource};
pub use transfer::{
    ChunkPlan, ChunkPolicy, Connector, HttpTransport, ReqwestConnector, ResourceTemplate,
    TemplateError, TransferConfig, TransferOrchestrator, TransferOutcome, TransferState,
    TransportError, TransportResponse, FINALIZE_SEGMENT,
};
pub use watcher::{
    file_queue, DeliveryGate, DirectoryWatcher, FileQueue, FileQueueHandle, PauseGuard,
    ReadinessConfig, ReadinessGate, WatchError,
};
