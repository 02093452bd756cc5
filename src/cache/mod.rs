pub(crate) mod list_snapshot;

pub(crate) use list_snapshot::{
    clear_list_snapshot, load_list_snapshot, prefer_unsynced, save_list_snapshot,
};
