//! Comprehensive unit tests for the Identifiers module
//!
//! Tests cover all identifier types, their creation, parsing,
//! conversion, and display formatting.

use core_kernel::{ContactId, ConsultationId, SyncTaskId};
use uuid::Uuid;

mod contact_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ContactId::new();
        let id2 = ContactId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_new_v7_generates_time_ordered_ids() {
        let id1 = ContactId::new_v7();
        std::thread::sleep(std::time::Duration::from_millis(1));
        let id2 = ContactId::new_v7();
        let uuid1: Uuid = id1.into();
        let uuid2: Uuid = id2.into();
        assert!(uuid1 < uuid2);
    }

    #[test]
    fn test_from_uuid() {
        let uuid = Uuid::new_v4();
        let id = ContactId::from_uuid(uuid);
        assert_eq!(*id.as_uuid(), uuid);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ContactId::prefix(), "CNT");
    }

    #[test]
    fn test_display_format() {
        let id = ContactId::new();
        let display = id.to_string();
        assert!(display.starts_with("CNT-"));
    }

    #[test]
    fn test_from_str_with_prefix() {
        let original = ContactId::new();
        let string = original.to_string();
        let parsed: ContactId = string.parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_uuid_conversion() {
        let uuid = Uuid::new_v4();
        let id: ContactId = uuid.into();
        let back: Uuid = id.into();
        assert_eq!(uuid, back);
    }

    #[test]
    fn test_json_serialization() {
        let id = ContactId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: ContactId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}

mod consultation_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = ConsultationId::new();
        let id2 = ConsultationId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(ConsultationId::prefix(), "CONS");
    }

    #[test]
    fn test_display_format() {
        let id = ConsultationId::new();
        let display = id.to_string();
        assert!(display.starts_with("CONS-"));
    }

    #[test]
    fn test_roundtrip() {
        let original = ConsultationId::new();
        let string = original.to_string();
        let parsed: ConsultationId = string.parse().unwrap();
        assert_eq!(original, parsed);
    }
}

mod sync_task_id_tests {
    use super::*;

    #[test]
    fn test_new_generates_unique_ids() {
        let id1 = SyncTaskId::new();
        let id2 = SyncTaskId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_prefix() {
        assert_eq!(SyncTaskId::prefix(), "SYNC");
    }

    #[test]
    fn test_display_format() {
        let id = SyncTaskId::new();
        let display = id.to_string();
        assert!(display.starts_with("SYNC-"));
    }
}

mod cross_type_tests {
    use super::*;

    #[test]
    fn test_different_id_types_are_distinct() {
        // Same UUID should create different identifier instances
        // that are type-safe (can't mix ContactId with ConsultationId)
        let uuid = Uuid::new_v4();
        let contact_id = ContactId::from_uuid(uuid);
        let consultation_id = ConsultationId::from_uuid(uuid);

        // They contain the same UUID but are different types
        assert_eq!(*contact_id.as_uuid(), *consultation_id.as_uuid());
    }

    #[test]
    fn test_id_prefixes_are_unique() {
        let prefixes = vec![
            ContactId::prefix(),
            ConsultationId::prefix(),
            SyncTaskId::prefix(),
        ];

        // Check all prefixes are unique
        let mut unique_prefixes: Vec<&str> = prefixes.clone();
        unique_prefixes.sort();
        unique_prefixes.dedup();

        assert_eq!(
            prefixes.len(),
            unique_prefixes.len(),
            "All identifier prefixes should be unique"
        );
    }
}

mod edge_cases {
    use super::*;

    #[test]
    fn test_nil_uuid() {
        let nil_uuid = Uuid::nil();
        let id = ContactId::from_uuid(nil_uuid);
        assert!(id.as_uuid().is_nil());
    }

    #[test]
    fn test_max_uuid() {
        let max_uuid = Uuid::max();
        let id = ContactId::from_uuid(max_uuid);
        assert_eq!(*id.as_uuid(), max_uuid);
    }
}
