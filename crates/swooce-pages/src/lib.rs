//! Standard page modules for swooce sites.
//!
//! Pages are files under the pages directory, loaded by extension:
//!
//! - `.html` files are served as they are
//! - `.md` and `.txt` files are shown preformatted
//! - `.toml` files declare a listing of other pages
//!
//! [`standard_site`] wires these together with verbatim copies of the
//! static directories.

pub mod document;
pub mod kinds;
pub mod site;

pub use document::{escape_html, HtmlDocument};
pub use kinds::{Listing, PageError, PageKind, PageModule};
pub use site::{page_modules, standard_site};
