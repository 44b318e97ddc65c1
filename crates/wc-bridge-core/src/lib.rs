pub mod converter;
pub mod domain;
pub mod interactor;
pub mod jrpc;
pub mod ports;
pub mod prepared;
pub mod request;

pub use converter::WcSessionRequestConverter;
pub use domain::{
    Account, NetworkNamespace, RequestData, Session, SessionProposal, SessionRequest,
    WalletConnectError, WalletConnectEvents, WalletConnectSession, WcSessionForScreen,
};
pub use interactor::{is_wallet_connect_uri, InteractorSettings, WalletConnectInteractor};
pub use jrpc::{decode_request, WcJrpcMethod};
pub use ports::{
    PortError, SessionsRepository, SigningSdk, UserNamespaces, WalletConnectEventsHandler,
    WalletConnectRepository, WcBlockchainHelper,
};
pub use prepared::{DappMetadata, WcPreparedPayload, WcPreparedRequest};
pub use request::WcRequest;
