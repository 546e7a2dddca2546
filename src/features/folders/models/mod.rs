mod folder;

pub use folder::{Folder, NewFolder, SubtreeMove};
