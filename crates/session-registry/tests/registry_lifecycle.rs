//! Registry behaviour under concurrent use

use session_registry::*;
use std::sync::Arc;

#[tokio::test]
async fn test_concurrent_initialization_registers_once() {
    let registry = Arc::new(SessionRegistry::new());
    let mut handles = vec![];

    for _ in 0..8 {
        let registry = Arc::clone(&registry);
        handles.push(tokio::spawn(async move {
            registry.initialize_session("shared").unwrap().newly_registered
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap() {
            created += 1;
        }
    }

    assert_eq!(created, 1);
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn test_concurrent_agent_registration() {
    let registry = SessionRegistry::new();
    registry.initialize_session("orchestrator").unwrap();
    let mut handles = vec![];

    for _ in 0..20 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry.register_agent("orchestrator");
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let status = registry.get_session_status("orchestrator").unwrap();
    assert_eq!(status.agent_count, 20);
}

#[test]
fn test_status_serializes_camel_case() {
    let status = SessionStatus {
        active: true,
        agent_count: 3,
    };
    let json = serde_json::to_value(status).unwrap();
    assert_eq!(json["agentCount"], 3);
    assert_eq!(json["active"], true);
}
