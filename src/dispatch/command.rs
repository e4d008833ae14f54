//! Host command surface
//!
//! Commands arrive as JSON objects tagged by `op`, with camelCase
//! arguments alongside:
//!
//! ```json
//! {"op": "removeAnnotation", "pageIndex": 0, "uuid": "12345"}
//! ```

use serde::{Deserialize, Serialize};

use crate::convert::{AnnotationRecord, WidgetRecord};
use crate::engine::memory::{A4_HEIGHT, A4_WIDTH};
use crate::engine::EncryptAlgo;
use crate::search::TextRange;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Command {
    // Handle inputs
    /// Replace the document of a live view
    Open {
        document: String,
        #[serde(default)]
        password: Option<String>,
    },
    SetDocument {
        document: String,
    },
    SetPassword {
        password: String,
    },
    SetConfiguration {
        /// The host's configuration JSON, as a string
        #[serde(default)]
        configuration: String,
    },

    // View
    GetCurrentPageIndex,
    SetDisplayPageIndex {
        page_index: usize,
    },
    SetMargins {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },

    // Document
    GetPageCount,
    GetFileName,
    GetDocumentPath,
    HasChange,
    Save,
    SaveAs {
        save_path: String,
        #[serde(default)]
        remove_security: bool,
        /// Falls back to the view configuration
        #[serde(default)]
        font_subset: Option<bool>,
    },
    FlattenAllPages {
        save_path: String,
        #[serde(default)]
        font_subset: Option<bool>,
    },
    ImportDocument {
        file_path: String,
        #[serde(default)]
        password: String,
        /// Empty imports every page
        #[serde(default)]
        pages: Vec<usize>,
        /// Negative or past the end appends
        #[serde(default = "append")]
        insert_position: i64,
    },
    SplitDocumentPages {
        save_path: String,
        pages: Vec<usize>,
    },
    InsertBlankPage {
        page_index: usize,
        #[serde(default = "a4_width")]
        width: f32,
        #[serde(default = "a4_height")]
        height: f32,
    },
    RemoveAllAnnotations,
    ImportAnnotations {
        xfdf_path: String,
    },
    ExportAnnotations,
    ImportWidgets {
        xfdf_path: String,
    },
    ExportWidgets,

    // Security
    IsEncrypted,
    GetPermissions,
    CheckOwnerUnlocked,
    CheckOwnerPassword {
        password: String,
    },
    /// Encrypt the document. Takes effect on the next save.
    SetDocumentPassword {
        #[serde(default)]
        user_password: Option<String>,
        #[serde(default)]
        owner_password: Option<String>,
        #[serde(default)]
        allows_printing: bool,
        #[serde(default)]
        allows_copying: bool,
        #[serde(default)]
        encrypt_algo: EncryptAlgo,
    },
    RemovePassword,
    GetEncryptAlgo,

    // Page objects
    GetAnnotations {
        page_index: usize,
    },
    GetWidgets {
        page_index: usize,
    },
    RemoveAnnotation {
        page_index: usize,
        uuid: String,
    },
    RemoveWidget {
        page_index: usize,
        uuid: String,
    },
    SetTextWidgetText {
        page_index: usize,
        uuid: String,
        text: String,
    },
    SetWidgetIsChecked {
        page_index: usize,
        uuid: String,
        is_checked: bool,
    },
    AddWidgetImageSignature {
        page_index: usize,
        uuid: String,
        image_path: String,
    },
    UpdateAp {
        page_index: usize,
        uuid: String,
    },

    // Search
    SearchText {
        keywords: String,
        #[serde(default)]
        search_options: u32,
    },
    Selection {
        page_index: usize,
        text_range_index: usize,
    },
    ClearSearch,
    GetSearchText {
        page_index: usize,
        location: usize,
        length: usize,
    },
}

fn append() -> i64 {
    -1
}

fn a4_width() -> f32 {
    A4_WIDTH
}

fn a4_height() -> f32 {
    A4_HEIGHT
}

impl Command {
    /// The host-facing operation name
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::SetDocument { .. } => "setDocument",
            Command::SetPassword { .. } => "setPassword",
            Command::SetConfiguration { .. } => "setConfiguration",
            Command::GetCurrentPageIndex => "getCurrentPageIndex",
            Command::SetDisplayPageIndex { .. } => "setDisplayPageIndex",
            Command::SetMargins { .. } => "setMargins",
            Command::GetPageCount => "getPageCount",
            Command::GetFileName => "getFileName",
            Command::GetDocumentPath => "getDocumentPath",
            Command::HasChange => "hasChange",
            Command::Save => "save",
            Command::SaveAs { .. } => "saveAs",
            Command::FlattenAllPages { .. } => "flattenAllPages",
            Command::ImportDocument { .. } => "importDocument",
            Command::SplitDocumentPages { .. } => "splitDocumentPages",
            Command::InsertBlankPage { .. } => "insertBlankPage",
            Command::RemoveAllAnnotations => "removeAllAnnotations",
            Command::ImportAnnotations { .. } => "importAnnotations",
            Command::ExportAnnotations => "exportAnnotations",
            Command::ImportWidgets { .. } => "importWidgets",
            Command::ExportWidgets => "exportWidgets",
            Command::IsEncrypted => "isEncrypted",
            Command::GetPermissions => "getPermissions",
            Command::CheckOwnerUnlocked => "checkOwnerUnlocked",
            Command::CheckOwnerPassword { .. } => "checkOwnerPassword",
            Command::SetDocumentPassword { .. } => "setDocumentPassword",
            Command::RemovePassword => "removePassword",
            Command::GetEncryptAlgo => "getEncryptAlgo",
            Command::GetAnnotations { .. } => "getAnnotations",
            Command::GetWidgets { .. } => "getWidgets",
            Command::RemoveAnnotation { .. } => "removeAnnotation",
            Command::RemoveWidget { .. } => "removeWidget",
            Command::SetTextWidgetText { .. } => "setTextWidgetText",
            Command::SetWidgetIsChecked { .. } => "setWidgetIsChecked",
            Command::AddWidgetImageSignature { .. } => "addWidgetImageSignature",
            Command::UpdateAp { .. } => "updateAp",
            Command::SearchText { .. } => "searchText",
            Command::Selection { .. } => "selection",
            Command::ClearSearch => "clearSearch",
            Command::GetSearchText { .. } => "getSearchText",
        }
    }
}

/// Success value of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Serialized as `null`
    Void,
    Bool(bool),
    Int(i64),
    Text(String),
    Annotations(Vec<AnnotationRecord>),
    Widgets(Vec<WidgetRecord>),
    Ranges(Vec<TextRange>),
}

impl Reply {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Reply::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Reply::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Reply::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::Void
    }
}

impl From<bool> for Reply {
    fn from(value: bool) -> Self {
        Reply::Bool(value)
    }
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Reply::Int(value)
    }
}

impl From<usize> for Reply {
    fn from(value: usize) -> Self {
        Reply::Int(value as i64)
    }
}

impl From<String> for Reply {
    fn from(value: String) -> Self {
        Reply::Text(value)
    }
}

impl From<Vec<AnnotationRecord>> for Reply {
    fn from(value: Vec<AnnotationRecord>) -> Self {
        Reply::Annotations(value)
    }
}

impl From<Vec<WidgetRecord>> for Reply {
    fn from(value: Vec<WidgetRecord>) -> Self {
        Reply::Widgets(value)
    }
}

impl From<Vec<TextRange>> for Reply {
    fn from(value: Vec<TextRange>) -> Self {
        Reply::Ranges(value)
    }
}
