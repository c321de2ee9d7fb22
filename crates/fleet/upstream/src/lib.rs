//! Upstream Clients
//!
//! Outbound access to the telematics API, the identity token endpoint, and
//! the graph document API.

mod error;
mod graph;
mod identity;
mod telematics;
mod traits;

pub use error::*;
pub use graph::{DEFAULT_GRAPH_URL, FolderTreeClient, GraphClient, LibraryClient, TRUCK_DOCS_FOLDER};
pub use identity::{DEFAULT_LOGIN_URL, GRAPH_SCOPE, IdentityClient};
pub use telematics::{DEFAULT_TELEMATICS_URL, TelematicsClient};
pub use traits::*;
