mod answer;
mod entity_set;
mod linked_entity;
mod record;

pub use answer::{ANSWER_NOT_FOUND, Answer, Verdict};
pub use entity_set::EntitySet;
pub use linked_entity::LinkedEntity;
pub use record::ResultRecord;
