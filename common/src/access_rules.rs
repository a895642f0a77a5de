use crate::entities::{actor::Actor, complaint::Complaint};

pub trait AccessRules<Object, Subject> {
    fn get_access(&self, object: Object, subject: Subject) -> bool;
}

pub struct Edit;

/// Only the creator may correct a complaint. Creators are matched by user
/// reference, or by the recorded username when either side lacks one.
impl<'a, 'b> AccessRules<&'a Complaint, &'b Actor> for Edit {
    fn get_access(&self, complaint: &'a Complaint, actor: &'b Actor) -> bool {
        match (&complaint.created_by, &actor.id) {
            (Some(creator), Some(id)) => creator == id,
            _ => {
                !complaint.created_by_username.is_empty()
                    && actor.username.as_deref() == Some(complaint.created_by_username.as_str())
            }
        }
    }
}
