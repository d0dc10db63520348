//! Change validator
//!
//! Pure structural validation of a [`ChangeDescriptor`]: accumulates every
//! violation instead of short-circuiting, so callers get the full list in
//! one round trip. Never touches storage.

use sge_substrate::{ChangeDescriptor, Operation};

/// Result of structural validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    /// True when no violations were found
    pub valid: bool,
    /// Field-level messages, in check order
    pub errors: Vec<String>,
}

impl ValidationOutcome {
    fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

/// Validate a descriptor, accumulating all violations
#[must_use]
pub fn validate(descriptor: &ChangeDescriptor) -> ValidationOutcome {
    let mut errors = Vec::new();

    if descriptor.actor_id.is_empty() {
        errors.push("actor_id is required".to_string());
    }
    if descriptor.ops.is_empty() {
        errors.push("ops must not be empty".to_string());
    }
    for (index, op) in descriptor.ops.iter().enumerate() {
        validate_op(index, op, &mut errors);
    }

    ValidationOutcome::from_errors(errors)
}

fn validate_op(index: usize, op: &Operation, errors: &mut Vec<String>) {
    let kind = op.kind();
    let mut require = |field: &str, present: bool| {
        if !present {
            errors.push(format!("ops[{index}] {kind}: {field} is required"));
        }
    };

    match op {
        Operation::CreateBlock {
            content,
            semantic_type,
            ..
        } => {
            require("content", !content.trim().is_empty());
            require("semantic_type", !semantic_type.trim().is_empty());
        }
        Operation::CreateContextItem { label, .. } => {
            require("label", !label.trim().is_empty());
        }
        Operation::ReviseBlock { content, .. } => {
            require("content", !content.trim().is_empty());
        }
        Operation::MergeContextItems {
            from_ids,
            canonical_id,
        } => {
            require("from_ids", !from_ids.is_empty());
            if from_ids.contains(canonical_id) {
                errors.push(format!(
                    "ops[{index}] {kind}: canonical_id must not appear in from_ids"
                ));
            }
        }
        Operation::DocumentEdit { content, .. } => {
            require("content", !content.trim().is_empty());
        }
        // Remaining kinds carry only typed ids; nothing can be missing.
        Operation::ArchiveBlock { .. }
        | Operation::AttachContextItem { .. }
        | Operation::PromoteScope { .. }
        | Operation::RedactDump { .. }
        | Operation::Delete { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sge_substrate::{ActorId, EntryPoint, SubstrateId, WorkspaceId};

    fn base() -> ChangeDescriptor {
        ChangeDescriptor::new(
            EntryPoint::ManualEdit,
            ActorId::new("user-1"),
            WorkspaceId::new(),
        )
    }

    #[test]
    fn valid_descriptor_passes() {
        let cd = base().with_op(Operation::CreateBlock {
            content: "Test goal".into(),
            semantic_type: "goal".into(),
            title: None,
        });
        let outcome = validate(&cd);
        assert!(outcome.valid, "unexpected errors: {:?}", outcome.errors);
    }

    #[test]
    fn empty_ops_rejected() {
        let outcome = validate(&base());
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec!["ops must not be empty".to_string()]);
    }

    #[test]
    fn violations_accumulate_in_order() {
        let cd = ChangeDescriptor::new(
            EntryPoint::ManualEdit,
            ActorId::new(""),
            WorkspaceId::new(),
        )
        .with_op(Operation::CreateBlock {
            content: "".into(),
            semantic_type: "".into(),
            title: None,
        })
        .with_op(Operation::ReviseBlock {
            block_id: SubstrateId::new(),
            content: " ".into(),
        });

        let outcome = validate(&cd);
        assert_eq!(
            outcome.errors,
            vec![
                "actor_id is required".to_string(),
                "ops[0] create_block: content is required".to_string(),
                "ops[0] create_block: semantic_type is required".to_string(),
                "ops[1] revise_block: content is required".to_string(),
            ]
        );
    }

    #[test]
    fn merge_requires_disjoint_canonical() {
        let shared = SubstrateId::new();
        let cd = base().with_op(Operation::MergeContextItems {
            from_ids: vec![shared],
            canonical_id: shared,
        });
        let outcome = validate(&cd);
        assert_eq!(
            outcome.errors,
            vec!["ops[0] merge_context_items: canonical_id must not appear in from_ids".to_string()]
        );
    }

    #[test]
    fn validation_is_pure() {
        let cd = base().with_op(Operation::ArchiveBlock {
            block_id: SubstrateId::new(),
        });
        let before = cd.clone();
        let _ = validate(&cd);
        assert_eq!(cd, before);
    }
}
