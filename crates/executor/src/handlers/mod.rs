//! Command handlers organized by category.
//!
//! | Module | Commands |
//! |--------|----------|
//! | `documents` | SaveDocuments |
//! | `query` | QueryView, QueryRaw, FetchCursor |
//! | `specs` | ListViews, ShowView, ListSchemas, ShowSchema, Status |

pub mod documents;
pub mod query;
pub mod specs;
