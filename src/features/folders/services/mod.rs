mod folder_service;

pub use folder_service::{FolderListing, FolderService};
