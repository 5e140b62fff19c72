pub mod domain;
pub mod ports;

pub use domain::{Flash, FlashKind, Post, Session, User, UserCredentials};
pub use ports::{
    CredentialStore, CryptoError, PortError, PortResult, PostStore, SessionStore, UserStore,
};
