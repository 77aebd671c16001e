//! # folio-content
//!
//! Content editing and display flow for the portfolio: uploading attached
//! files, form controllers that commit drafts to the store, viewers that turn
//! subscription deliveries into typed records and cards, and the session
//! gate that decides between the public site and the admin dashboard.

pub mod blob;
pub mod controller;
pub mod countries;
pub mod dashboard;
pub mod gate;
pub mod identity;
pub mod viewer;

mod error;

pub use blob::{BlobHandle, BlobKey, BlobUploader, ImageHostClient, LocalBlobStore};
pub use controller::{DeleteConfirmation, FormController, FormMode, SelectedFile};
pub use countries::{CountryDirectory, CountryOption};
pub use dashboard::{DashboardShell, DashboardTab};
pub use error::{BlobError, ControllerError, CountryError, GateError, ViewerError};
pub use gate::{GateState, RootView, Route, SessionGate};
pub use identity::{Identity, IdentityProvider, TokenIdentityProvider};
pub use viewer::{ListViewer, Mounted, SingletonViewer, View, ViewerState};
