mod record;
mod record_type;

pub use record::{RecordData, ReplyEntry};
pub use record_type::{record_type_description, RecordType};
