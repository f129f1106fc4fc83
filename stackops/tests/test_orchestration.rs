use std::time::Duration;

use helper::{running, stack, stopped, FakeStackApi, StackConfigExt};
use stackops::{
    config::StackopsConfig,
    models::{Operation, OperationResult},
    orchestration::StackManager,
    presentation::ERROR_BADGE,
    StackopsError,
};

//--------------------------------------------------------------------------------------------------
// Constants
//--------------------------------------------------------------------------------------------------

const REFRESH_DELAY: Duration = Duration::from_millis(1000);

const SETTLE_REFRESH_DELAY: Duration = Duration::from_millis(5000);

const FAILED_UP_OUTPUT: &str = "\
Error response from daemon: conflict
container shop_db_1 not found
more detail line";

//--------------------------------------------------------------------------------------------------
// Tests: Registry
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_load_and_refresh() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web").service("api")]);
    api.set_services(
        1,
        vec![
            running("api", "shop_api_1"),
            serde_json::json!({
                "service_name": "db",
                "container_name": "shop_db_1",
                "status": "exited",
            }),
        ],
    );
    api.fail_services(2);
    let manager = api.manager();

    assert!(!manager.registry().is_loaded());
    let stacks = manager.load().await?;
    assert_eq!(stacks.len(), 2);
    assert!(manager.registry().is_loaded());

    manager.refresh_all(true).await;

    let shop = manager.snapshot(1).expect("shop was polled");
    assert!(shop.is_running);
    assert!(!shop.has_specific_service);
    assert_eq!(shop.services.len(), 2);
    assert_eq!(shop.services[0].service_name, "api");
    assert_eq!(shop.services[0].container_name, "shop_api_1");
    assert_eq!(shop.services[1].status, "exited");

    // A failed fetch is recorded as a stack with nothing running
    let web = manager.snapshot(2).expect("web was polled");
    assert!(!web.is_running);
    assert!(web.services.is_empty());
    assert!(web.has_specific_service);

    assert!(!manager.is_refreshing(1));
    assert!(!manager.is_refreshing(2));

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_refresh_is_idempotent() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    api.set_services(1, vec![running("api", "shop_api_1"), stopped("db", "shop_db_1")]);
    let manager = api.manager();
    manager.load().await?;

    manager.refresh_all(false).await;
    let first = manager.snapshot(1);
    manager.refresh_all(false).await;

    assert_eq!(manager.snapshot(1), first);
    assert_eq!(api.services_calls(1), 2);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_registry_unavailable_keeps_view() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web")]);
    let manager = api.manager();
    manager.load().await?;

    api.fail_list(true);
    let result = manager.load().await;

    assert!(matches!(result, Err(StackopsError::RegistryUnavailable(_))));
    assert_eq!(manager.stacks().len(), 2);
    assert!(manager.registry().is_loaded());

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_registry_unavailable_is_not_empty() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    api.fail_list(true);
    let manager = api.manager();

    assert!(manager.load().await.is_err());
    assert!(!manager.registry().is_loaded());
    assert!(manager.stacks().is_empty());

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_load_forgets_vanished_stacks() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web")]);
    api.set_services(2, vec![running("web", "web_web_1")]);
    let manager = api.manager();
    manager.load().await?;
    manager.refresh_all(false).await;

    manager.dispatch(2, Operation::Down).await?;
    assert_eq!(manager.pending_refreshes(2), vec![REFRESH_DELAY]);

    api.set_stacks(vec![stack(1, "shop")]);
    manager.load().await?;

    assert!(manager.snapshot(2).is_none());
    assert!(manager.view(2).is_none());
    assert!(manager.pending_refreshes(2).is_empty());

    let calls = api.services_calls(2);
    tokio::time::sleep(SETTLE_REFRESH_DELAY).await;
    assert_eq!(api.services_calls(2), calls);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_remove_failure_keeps_stack() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    api.fail_delete(true);
    let result = manager.remove(1).await;
    assert!(matches!(
        result,
        Err(StackopsError::RemoveFailed { stack_id: 1, .. })
    ));
    assert!(manager.registry().contains(1));

    let result = manager.remove(99).await;
    assert!(matches!(result, Err(StackopsError::StackNotFound(99))));
    assert_eq!(api.delete_calls(), vec![1]);

    api.fail_delete(false);
    manager.remove(1).await?;
    assert!(!manager.registry().contains(1));
    assert!(manager.stacks().is_empty());

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests: Status polling
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_refresh_batch_is_sequential() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web"), stack(3, "mail")]);
    for id in 1..=3 {
        api.set_services(id, vec![running("api", &format!("stack{id}_api_1"))]);
    }
    let manager = api.manager();
    manager.load().await?;

    let gate = api.gate_services(2);
    let refresh = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh_all(true).await }
    });

    while api.services_order().len() < 2 {
        tokio::task::yield_now().await;
    }

    // Stack 3 waits for stack 2, and the whole batch stays marked meanwhile
    assert_eq!(api.services_order(), vec![1, 2]);
    assert!(manager.snapshot(1).is_some());
    assert!(manager.snapshot(3).is_none());
    for id in 1..=3 {
        assert!(manager.is_refreshing(id), "stack {id} should be refreshing");
    }

    gate.notify_one();
    refresh.await?;

    assert_eq!(api.services_order(), vec![1, 2, 3]);
    for id in 1..=3 {
        assert!(!manager.is_refreshing(id));
        assert!(manager.snapshot(id).is_some_and(|snapshot| snapshot.is_running));
    }

    // An explicit batch is visited in the caller's order
    let stacks = manager.stacks();
    let batch: Vec<_> = [3, 1, 2]
        .into_iter()
        .filter_map(|id| stacks.iter().find(|stack| stack.id == id).cloned())
        .collect();
    gate.notify_one();
    manager.poller().refresh(&batch, false).await;

    assert_eq!(api.services_order()[3..], [3, 1, 2]);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_unreadable_services_fail_open() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web").service("api")]);
    api.set_services(1, vec![running("api", "shop_api_1")]);
    api.set_services(2, vec![running("api", "web_api_1")]);
    let manager = api.manager();
    manager.load().await?;

    manager.refresh_all(false).await;
    assert!(manager.snapshot(1).is_some_and(|snapshot| snapshot.is_running));

    api.refuse_services(2, "docker-compose.yml not found");
    api.refuse_services(1, "compose project not found");
    manager.refresh_all(true).await;

    let shop = manager.snapshot(1).expect("shop was polled");
    assert!(!shop.is_running);
    assert!(shop.services.is_empty());
    assert!(!shop.has_specific_service);

    let web = manager.snapshot(2).expect("web was polled");
    assert!(!web.is_running);
    assert!(web.has_specific_service);

    assert_eq!(api.services_order(), vec![1, 2, 1, 2]);
    assert!(!manager.is_refreshing(1));
    assert!(!manager.is_refreshing(2));

    let result = manager.dispatch(1, Operation::Restart).await;
    assert!(matches!(
        result,
        Err(StackopsError::OperationNotAllowed {
            stack_id: 1,
            operation: Operation::Restart,
        })
    ));

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests: Dispatch
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_dispatch_is_single_flight() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web")]);
    let manager = api.manager();
    manager.load().await?;

    let gate = api.gate_operations(1);
    let first = tokio::spawn({
        let manager = manager.clone();
        async move { manager.dispatch(1, Operation::Down).await }
    });

    api.operation_entered().await;
    assert_eq!(manager.current_operation(1), Some(Operation::Down));
    assert!(!manager.view(1).expect("shop is registered").can_operate());

    let second = manager.dispatch(1, Operation::Up).await;
    assert!(matches!(
        second,
        Err(StackopsError::OperationInProgress {
            stack_id: 1,
            operation: Operation::Down,
        })
    ));

    // Other stacks are not blocked
    let other = manager.dispatch(2, Operation::Ps).await?;
    assert!(other.success);

    gate.notify_one();
    let result = first.await??;
    assert!(result.success);

    assert_eq!(api.operations(1), vec![Operation::Down]);
    assert_eq!(manager.current_operation(1), None);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_concurrent_dispatches_reach_backend_once() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    let gate = api.gate_operations(1);
    let dispatches = futures::future::join_all((0..4).map(|_| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.dispatch(1, Operation::Pull).await })
    }));

    let release = async {
        api.operation_entered().await;
        gate.notify_one();
    };

    let (results, _) = tokio::join!(dispatches, release);

    let mut succeeded = 0;
    let mut rejected = 0;
    for result in results {
        match result? {
            Ok(_) => succeeded += 1,
            Err(StackopsError::OperationInProgress { .. }) => rejected += 1,
            Err(e) => return Err(e.into()),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 3);
    assert_eq!(api.operations(1), vec![Operation::Pull]);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_restart_and_build_require_running() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    // Never polled
    let result = manager.dispatch(1, Operation::Restart).await;
    assert!(matches!(
        result,
        Err(StackopsError::OperationNotAllowed {
            stack_id: 1,
            operation: Operation::Restart,
        })
    ));

    // Polled, but nothing is running
    manager.refresh_all(false).await;
    let result = manager.dispatch(1, Operation::Build).await;
    assert!(matches!(
        result,
        Err(StackopsError::OperationNotAllowed {
            stack_id: 1,
            operation: Operation::Build,
        })
    ));

    assert!(api.operations(1).is_empty());
    assert!(manager.pending_refreshes(1).is_empty());
    assert!(manager.current_operation(1).is_none());

    let view = manager.view(1).expect("shop is registered");
    assert!(view.can_operate());
    assert!(!view.can_restart());
    assert!(!view.can_build());

    api.set_services(1, vec![running("api", "shop_api_1")]);
    manager.refresh_all(false).await;
    assert!(manager.view(1).expect("shop is registered").can_restart());
    assert!(manager.dispatch(1, Operation::Restart).await?.success);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_unknown_stack_is_rejected() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    let result = manager.dispatch(99, Operation::Up).await;
    assert!(matches!(result, Err(StackopsError::StackNotFound(99))));
    assert!(api.operations(99).is_empty());
    assert!(manager.pending_refreshes(99).is_empty());

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_dispatch_sends_stack_target() -> anyhow::Result<()> {
    let mut web = stack(2, "web").service("api");
    web.flags.insert("detach".into(), true.into());
    web.flags.insert("build".into(), false.into());
    web.flags.insert("project-name".into(), "billing".into());
    let api = FakeStackApi::new(vec![web]);
    let manager = api.manager();
    manager.load().await?;

    manager.dispatch(2, Operation::Logs).await?;

    let requests = api.requests(2);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].operation, Operation::Logs);
    assert_eq!(requests[0].service_name.as_deref(), Some("api"));
    assert_eq!(requests[0].flags.get("detach"), Some(&true.into()));
    assert_eq!(requests[0].flags.get("build"), Some(&false.into()));
    assert_eq!(requests[0].flags.get("project-name"), Some(&"billing".into()));
    let registered = manager.registry().get(2).expect("web is registered");
    assert_eq!(requests[0].flags, registered.flags);

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests: Refresh scheduling
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_up_schedules_two_refreshes() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    let result = manager.dispatch(1, Operation::Up).await?;
    assert!(result.success);
    assert_eq!(
        manager.pending_refreshes(1),
        vec![REFRESH_DELAY, SETTLE_REFRESH_DELAY]
    );

    api.set_services(1, vec![running("api", "shop_api_1")]);
    tokio::time::sleep(REFRESH_DELAY + Duration::from_millis(100)).await;

    assert_eq!(manager.pending_refreshes(1), vec![SETTLE_REFRESH_DELAY]);
    assert_eq!(api.services_calls(1), 1);
    assert!(manager.snapshot(1).expect("refreshed").is_running);

    tokio::time::sleep(SETTLE_REFRESH_DELAY).await;
    assert!(manager.pending_refreshes(1).is_empty());
    assert_eq!(api.services_calls(1), 2);
    assert!(!manager.is_refreshing(1));

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_other_mutations_schedule_one_refresh() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    api.set_services(1, vec![running("api", "shop_api_1")]);
    let manager = api.manager();
    manager.load().await?;

    for operation in [
        Operation::Down,
        Operation::Restart,
        Operation::Build,
        Operation::Pull,
    ] {
        manager.refresh_all(false).await;
        manager.dispatch(1, operation).await?;
        assert_eq!(manager.pending_refreshes(1), vec![REFRESH_DELAY], "{operation}");

        tokio::time::sleep(REFRESH_DELAY * 2).await;
        assert!(manager.pending_refreshes(1).is_empty(), "{operation}");
    }

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_read_only_operations_change_nothing() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    api.push_result(1, failure("up failed", FAILED_UP_OUTPUT));
    manager.dispatch(1, Operation::Up).await?;
    let errors = manager.container_errors(1);
    assert_eq!(errors.len(), 1);
    manager.scheduler().cancel(1);

    api.push_result(1, failure("ps failed", "container shop_api_1 not found"));
    let result = manager.dispatch(1, Operation::Ps).await?;
    assert!(!result.success);

    let result = manager.dispatch(1, Operation::Logs).await?;
    assert!(result.success);

    assert_eq!(manager.container_errors(1), errors);
    assert!(manager.pending_refreshes(1).is_empty());

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests: Container errors
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_failure_records_container_errors() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    api.set_services(1, vec![running("api", "shop_api_1"), stopped("db", "shop_db_1")]);
    let manager = api.manager();
    manager.load().await?;
    manager.refresh_all(false).await;

    api.push_result(1, failure("up failed", FAILED_UP_OUTPUT));
    let result = manager.dispatch(1, Operation::Up).await?;
    assert!(!result.success);

    let errors = manager.container_errors(1);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors["shop_db_1"],
        "container shop_db_1 not found\nmore detail line"
    );

    // A failed up gets a single follow-up refresh
    assert_eq!(manager.pending_refreshes(1), vec![REFRESH_DELAY]);

    let view = manager.view(1).expect("shop is registered");
    let db = view
        .services
        .iter()
        .find(|service| service.container_name == "shop_db_1")
        .expect("db container is listed");
    assert_eq!(db.badge, ERROR_BADGE);
    assert!(db.error.is_some());

    // Failures merge into the existing errors
    api.push_result(1, failure("down failed", "container shop_cache_1 not found"));
    manager.dispatch(1, Operation::Down).await?;
    assert_eq!(manager.container_errors(1).len(), 2);

    // Failures without output leave them alone
    api.push_result(1, failure("pull failed", ""));
    manager.dispatch(1, Operation::Pull).await?;
    assert_eq!(manager.container_errors(1).len(), 2);

    // Any mutating success clears them
    manager.dispatch(1, Operation::Down).await?;
    assert!(manager.container_errors(1).is_empty());

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_transport_failure_is_a_failed_result() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    api.push_error(1, "connection refused");
    let result = manager.dispatch(1, Operation::Down).await?;

    assert!(!result.success);
    assert!(result.message.starts_with("down failed: "));
    assert!(result.message.contains("connection refused"));
    assert!(result.output.is_empty());
    assert!(manager.container_errors(1).is_empty());
    assert_eq!(manager.pending_refreshes(1), vec![REFRESH_DELAY]);
    assert_eq!(manager.current_operation(1), None);

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Tests: Lifecycle
//--------------------------------------------------------------------------------------------------

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_remove_cancels_pending_refreshes() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop"), stack(2, "web")]);
    let manager = api.manager();
    manager.load().await?;

    manager.dispatch(1, Operation::Up).await?;
    assert_eq!(manager.pending_refreshes(1).len(), 2);

    manager.remove(1).await?;
    assert!(manager.pending_refreshes(1).is_empty());

    tokio::time::sleep(SETTLE_REFRESH_DELAY * 2).await;

    assert_eq!(api.services_calls(1), 0);
    assert!(manager.snapshot(1).is_none());
    assert!(!manager.registry().contains(1));
    assert_eq!(manager.stacks().len(), 1);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_removal_during_refresh_does_not_resurrect() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    api.set_services(1, vec![running("api", "shop_api_1")]);
    let manager = api.manager();
    manager.load().await?;

    let gate = api.gate_services(1);
    let refresh = tokio::spawn({
        let manager = manager.clone();
        async move { manager.refresh_stack(1, true).await }
    });

    api.services_entered().await;
    assert!(manager.is_refreshing(1));

    manager.remove(1).await?;
    gate.notify_one();

    let result = refresh.await?;
    assert!(matches!(result, Err(StackopsError::StackNotFound(1))));
    assert!(manager.snapshot(1).is_none());
    assert!(!manager.is_refreshing(1));
    assert!(manager.view(1).is_none());

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_removal_during_operation() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    let gate = api.gate_operations(1);
    api.push_result(1, failure("up failed", FAILED_UP_OUTPUT));
    let operation = tokio::spawn({
        let manager = manager.clone();
        async move { manager.dispatch(1, Operation::Up).await }
    });

    api.operation_entered().await;
    manager.remove(1).await?;
    gate.notify_one();

    let result = operation.await??;
    assert!(!result.success);
    assert!(manager.container_errors(1).is_empty());
    assert!(manager.pending_refreshes(1).is_empty());
    assert_eq!(manager.current_operation(1), None);

    Ok(())
}

#[test_log::test(tokio::test(start_paused = true))]
async fn test_orchestration_shutdown_cancels_refreshes() -> anyhow::Result<()> {
    let api = FakeStackApi::new(vec![stack(1, "shop")]);
    let manager = api.manager();
    manager.load().await?;

    manager.dispatch(1, Operation::Up).await?;
    manager.shutdown();
    assert!(manager.pending_refreshes(1).is_empty());

    manager.dispatch(1, Operation::Down).await?;
    assert!(manager.pending_refreshes(1).is_empty());

    tokio::time::sleep(SETTLE_REFRESH_DELAY * 2).await;
    assert_eq!(api.services_calls(1), 0);

    Ok(())
}

//--------------------------------------------------------------------------------------------------
// Functions: Helpers
//--------------------------------------------------------------------------------------------------

fn failure(message: &str, output: &str) -> OperationResult {
    OperationResult {
        success: false,
        message: message.to_string(),
        output: output.to_string(),
    }
}

mod helper {
    use std::{
        collections::{HashMap, VecDeque},
        sync::{Arc, Mutex},
    };

    use serde_json::{json, Map, Value};
    use stackops::{
        api::StackApi,
        models::{
            Operation, OperationRequest, OperationResult, RawService, ServicesResponse,
            StackConfig, StackId,
        },
        StackopsError, StackopsResult,
    };
    use tokio::sync::Notify;

    use super::*;

    /// An in-memory stack backend with scripted answers.
    #[derive(Default)]
    pub(super) struct FakeStackApi {
        state: Mutex<FakeState>,
        operation_entered: Notify,
        services_entered: Notify,
    }

    #[derive(Default)]
    struct FakeState {
        stacks: Vec<StackConfig>,
        list_fails: bool,
        delete_fails: bool,
        services: HashMap<StackId, Vec<Value>>,
        failing_services: Vec<StackId>,
        unreadable_services: HashMap<StackId, String>,
        results: HashMap<StackId, VecDeque<Result<OperationResult, String>>>,
        operation_gates: HashMap<StackId, Arc<Notify>>,
        services_gates: HashMap<StackId, Arc<Notify>>,
        requests: Vec<(StackId, OperationRequest)>,
        services_calls: Vec<StackId>,
        delete_calls: Vec<StackId>,
    }

    pub(super) trait StackConfigExt {
        fn service(self, service_name: &str) -> Self;
    }

    impl StackConfigExt for StackConfig {
        fn service(mut self, service_name: &str) -> Self {
            self.service_name = Some(service_name.to_string());
            self
        }
    }

    pub(super) fn stack(id: StackId, name: &str) -> StackConfig {
        StackConfig {
            id,
            name: name.to_string(),
            path: format!("/srv/{name}/docker-compose.yml"),
            service_name: None,
            description: None,
            flags: Map::new(),
            is_active: true,
        }
    }

    pub(super) fn running(service: &str, container: &str) -> Value {
        json!({ "Service": service, "Name": container, "State": "running" })
    }

    pub(super) fn stopped(service: &str, container: &str) -> Value {
        json!({ "Service": service, "Name": container, "State": "exited" })
    }

    impl FakeStackApi {
        pub(super) fn new(stacks: Vec<StackConfig>) -> Arc<Self> {
            let api = Self::default();
            api.set_stacks(stacks);
            Arc::new(api)
        }

        pub(super) fn manager(self: &Arc<Self>) -> StackManager {
            let config = StackopsConfig::builder()
                .refresh_delay(REFRESH_DELAY)
                .settle_refresh_delay(SETTLE_REFRESH_DELAY)
                .build();

            StackManager::new(self.clone(), &config)
        }

        pub(super) fn set_stacks(&self, stacks: Vec<StackConfig>) {
            self.state().stacks = stacks;
        }

        pub(super) fn set_services(&self, id: StackId, services: Vec<Value>) {
            self.state().services.insert(id, services);
        }

        pub(super) fn fail_services(&self, id: StackId) {
            self.state().failing_services.push(id);
        }

        /// Answers services requests for the stack with `success: false` and the message.
        pub(super) fn refuse_services(&self, id: StackId, message: &str) {
            self.state()
                .unreadable_services
                .insert(id, message.to_string());
        }

        pub(super) fn fail_list(&self, fail: bool) {
            self.state().list_fails = fail;
        }

        pub(super) fn fail_delete(&self, fail: bool) {
            self.state().delete_fails = fail;
        }

        pub(super) fn push_result(&self, id: StackId, result: OperationResult) {
            self.state()
                .results
                .entry(id)
                .or_default()
                .push_back(Ok(result));
        }

        pub(super) fn push_error(&self, id: StackId, error: &str) {
            self.state()
                .results
                .entry(id)
                .or_default()
                .push_back(Err(error.to_string()));
        }

        /// Holds every operate request for the stack until the returned gate is notified.
        pub(super) fn gate_operations(&self, id: StackId) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.state().operation_gates.insert(id, gate.clone());
            gate
        }

        /// Holds every services request for the stack until the returned gate is notified.
        pub(super) fn gate_services(&self, id: StackId) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.state().services_gates.insert(id, gate.clone());
            gate
        }

        pub(super) async fn operation_entered(&self) {
            self.operation_entered.notified().await;
        }

        pub(super) async fn services_entered(&self) {
            self.services_entered.notified().await;
        }

        pub(super) fn requests(&self, id: StackId) -> Vec<OperationRequest> {
            self.state()
                .requests
                .iter()
                .filter(|(stack_id, _)| *stack_id == id)
                .map(|(_, request)| request.clone())
                .collect()
        }

        pub(super) fn operations(&self, id: StackId) -> Vec<Operation> {
            self.requests(id)
                .into_iter()
                .map(|request| request.operation)
                .collect()
        }

        pub(super) fn services_calls(&self, id: StackId) -> usize {
            self.state()
                .services_calls
                .iter()
                .filter(|stack_id| **stack_id == id)
                .count()
        }

        /// Every stack whose services were requested, in request order.
        pub(super) fn services_order(&self) -> Vec<StackId> {
            self.state().services_calls.clone()
        }

        pub(super) fn delete_calls(&self) -> Vec<StackId> {
            self.state().delete_calls.clone()
        }

        fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
            self.state.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl StackApi for FakeStackApi {
        async fn list_stacks(&self) -> StackopsResult<Vec<StackConfig>> {
            let state = self.state();
            if state.list_fails {
                return Err(StackopsError::Backend {
                    status: 503,
                    message: "registry offline".into(),
                });
            }

            Ok(state.stacks.clone())
        }

        async fn delete_stack(&self, id: StackId) -> StackopsResult<()> {
            let mut state = self.state();
            state.delete_calls.push(id);
            if state.delete_fails {
                return Err(StackopsError::Backend {
                    status: 500,
                    message: "stack is locked".into(),
                });
            }

            state.stacks.retain(|stack| stack.id != id);
            Ok(())
        }

        async fn get_services(&self, id: StackId) -> StackopsResult<ServicesResponse> {
            let gate = {
                let mut state = self.state();
                state.services_calls.push(id);
                state.services_gates.get(&id).cloned()
            };

            self.services_entered.notify_one();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let state = self.state();
            if state.failing_services.contains(&id) {
                return Err(StackopsError::custom(anyhow::anyhow!("connection reset")));
            }

            if let Some(message) = state.unreadable_services.get(&id) {
                return Ok(ServicesResponse {
                    success: false,
                    services: Vec::new(),
                    message: Some(message.clone()),
                });
            }

            let services = state
                .services
                .get(&id)
                .cloned()
                .unwrap_or_default()
                .into_iter()
                .filter_map(|value| serde_json::from_value::<RawService>(value).ok())
                .collect();

            Ok(ServicesResponse {
                success: true,
                services,
                message: None,
            })
        }

        async fn operate(
            &self,
            id: StackId,
            request: OperationRequest,
        ) -> StackopsResult<OperationResult> {
            let operation = request.operation;
            let gate = {
                let mut state = self.state();
                state.requests.push((id, request));
                state.operation_gates.get(&id).cloned()
            };

            self.operation_entered.notify_one();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let scripted = self
                .state()
                .results
                .get_mut(&id)
                .and_then(VecDeque::pop_front);

            match scripted {
                Some(Ok(result)) => Ok(result),
                Some(Err(error)) => Err(StackopsError::custom(anyhow::anyhow!(error))),
                None => Ok(OperationResult {
                    success: true,
                    message: format!("{operation} completed"),
                    output: String::new(),
                }),
            }
        }
    }
}
