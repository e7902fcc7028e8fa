mod document;

pub(crate) use self::document::{DOCUMENT_COLUMNS, DocumentRow};
