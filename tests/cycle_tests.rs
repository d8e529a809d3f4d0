//! End-to-end cycle behavior: mutually-referencing graphs resolve through
//! member injection, constructor cycles fail, configuration disables
//! bridging entirely.

use std::sync::{Arc, Mutex};

use wyre::{
    CycleReason, DependencyRequest, EngineConfig, FnRecipe, Handle, Instance, Key,
    ResolutionError, ScopeExt, ScopeKind, ScopeTree,
};

#[derive(Default)]
struct Client {
    server: Mutex<Option<Instance>>,
}

#[derive(Default)]
struct Server {
    client: Mutex<Option<Instance>>,
}

fn bind_pair(root: &wyre::Scope) {
    root.bind(
        Key::of::<Client>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::member(Key::of::<Server>())],
                |_| Ok(Some(Arc::new(Client::default()))),
            )
            .with_inject(|instance, deps| {
                let client = instance.clone().downcast::<Client>().unwrap();
                *client.server.lock().unwrap() = deps.get(0).and_then(|d| d.instance());
                Ok(())
            }),
        ),
        ScopeKind::Singleton,
    )
    .unwrap();
    root.bind(
        Key::of::<Server>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::member(Key::of::<Client>())],
                |_| Ok(Some(Arc::new(Server::default()))),
            )
            .with_inject(|instance, deps| {
                let server = instance.clone().downcast::<Server>().unwrap();
                *server.client.lock().unwrap() = deps.get(0).and_then(|d| d.instance());
                Ok(())
            }),
        ),
        ScopeKind::Singleton,
    )
    .unwrap();
}

#[test]
fn member_cycle_resolves_to_mutually_referencing_singletons() {
    let root = ScopeTree::builder().build();
    bind_pair(&root);

    let client = root.get::<Client>().unwrap();
    let server = client
        .server
        .lock()
        .unwrap()
        .clone()
        .expect("client was injected with the server")
        .downcast::<Server>()
        .unwrap();
    let client_again = server
        .client
        .lock()
        .unwrap()
        .clone()
        .expect("server was injected with the client")
        .downcast::<Client>()
        .unwrap();
    assert!(Arc::ptr_eq(&client, &client_again));

    // And the singleton caches settled on the same instances.
    assert!(Arc::ptr_eq(&server, &root.get::<Server>().unwrap()));
}

#[test]
fn the_same_cycle_through_constructor_parameters_fails() {
    #[derive(Debug)]
    struct Client;
    struct Server;

    let root = ScopeTree::builder().build();
    root.bind(
        Key::of::<Client>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::constructor(Key::of::<Server>())],
                |_| Ok(Some(Arc::new(Client))),
            )
            .delegatable(),
        ),
        ScopeKind::Singleton,
    )
    .unwrap();
    root.bind(
        Key::of::<Server>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::constructor(Key::of::<Client>())],
                |_| Ok(Some(Arc::new(Server))),
            )
            .delegatable(),
        ),
        ScopeKind::Singleton,
    )
    .unwrap();

    let errors = root.get::<Client>().unwrap_err();
    assert!(matches!(
        errors.first(),
        ResolutionError::CircularDependency {
            reason: CycleReason::ConstructorEdge,
            ..
        }
    ));
}

#[test]
fn deferred_handle_binds_after_the_cycle_completes() {
    struct Owner {
        worker: Instance,
    }
    #[derive(Default)]
    struct Worker {
        owner: Mutex<Option<Handle>>,
    }

    let root = ScopeTree::builder().build();
    root.bind(
        Key::of::<Owner>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::constructor(Key::of::<Worker>())],
                |deps| {
                    Ok(Some(Arc::new(Owner {
                        worker: deps.get(0).and_then(|d| d.instance()).unwrap(),
                    })))
                },
            )
            .delegatable(),
        ),
        ScopeKind::Unscoped,
    )
    .unwrap();
    root.bind(
        Key::of::<Worker>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::member(Key::of::<Owner>())],
                |_| Ok(Some(Arc::new(Worker::default()))),
            )
            .with_inject(|instance, deps| {
                let worker = instance.clone().downcast::<Worker>().unwrap();
                let handle = deps.get(0).and_then(|d| d.handle().cloned());
                // Mid-cycle the handle is still unbound.
                if let Some(h) = &handle {
                    assert!(h.is_deferred());
                }
                *worker.owner.lock().unwrap() = handle;
                Ok(())
            }),
        ),
        ScopeKind::Unscoped,
    )
    .unwrap();

    let owner = root.get::<Owner>().unwrap();
    let worker = owner.worker.clone().downcast::<Worker>().unwrap();
    let bound = worker
        .owner
        .lock()
        .unwrap()
        .clone()
        .expect("worker stored the deferred handle")
        .resolve()
        .expect("the handle bound when the owner finished");
    assert!(Arc::ptr_eq(&owner, &bound.downcast::<Owner>().unwrap()));
}

#[test]
fn disabling_deferred_cycles_makes_the_bridge_fatal() {
    #[derive(Debug)]
    struct Owner;
    #[derive(Default)]
    struct Worker;

    let root = ScopeTree::builder()
        .config(EngineConfig::new().without_deferred_cycles())
        .build();
    root.bind(
        Key::of::<Owner>(),
        Arc::new(
            FnRecipe::new(
                vec![DependencyRequest::constructor(Key::of::<Worker>())],
                |_| Ok(Some(Arc::new(Owner))),
            )
            .delegatable(),
        ),
        ScopeKind::Unscoped,
    )
    .unwrap();
    root.bind(
        Key::of::<Worker>(),
        Arc::new(FnRecipe::new(
            vec![DependencyRequest::member(Key::of::<Owner>())],
            |_| Ok(Some(Arc::new(Worker::default()))),
        )),
        ScopeKind::Unscoped,
    )
    .unwrap();

    let errors = root.get::<Owner>().unwrap_err();
    assert!(matches!(
        errors.first(),
        ResolutionError::CircularDependency {
            reason: CycleReason::DeferralDisabled,
            ..
        }
    ));
}
