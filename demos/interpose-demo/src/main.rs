//! interpose demo host
//!
//! Usage: `interpose-demo [agent-arguments]`, for example
//! `interpose-demo 'all:org.example.service,org.example.dao&verbose=true'`.

mod services;

use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};

use interpose_core::{CallResult, LoaderId};
use interpose_dispatch::WrapperTable;
use interpose_runtime::{init_logging, Agent, AgentArgs, Heartbeat, StreamListener};

use services::{HelloController, Host, OrderService, UserDao, UserService};

fn report(label: &str, outcome: CallResult) -> bool {
    match outcome {
        Ok(value) => {
            info!("[Demo] {} -> {}", label, value);
            true
        }
        Err(failure) => {
            warn!("[Demo] {} failed: {}", label, failure);
            false
        }
    }
}

fn exercise(host: &Host) -> usize {
    let users = UserService(host.clone());
    let orders = OrderService(host.clone());
    let dao = UserDao(host.clone());
    let web = HelloController(host.clone());

    let outcomes = [
        report("UserService.getUserById", users.get_user_by_id(1)),
        report("UserService.findUserByName", users.find_user_by_name("alice")),
        report("UserService.saveUser", users.save_user("bob", 30)),
        report("UserService.getUserCount", users.get_user_count()),
        report("OrderService.createOrder", orders.create_order("book", 29.99)),
        report("OrderService.getOrderStatus", orders.get_order_status(7)),
        report("OrderService.cancelOrder", orders.cancel_order(7)),
        // propagates unchanged through every installed layer
        report("OrderService.cancelOrder", orders.cancel_order(-1)),
        report("UserDao.queryById", dao.query_by_id(42)),
        report("UserDao.insert", dao.insert("carol")),
        report("UserDao.update", dao.update(42, "carol")),
        report("HelloController.hello", web.hello("world")),
    ];
    outcomes.iter().filter(|ok| !**ok).count()
}

fn main() -> ExitCode {
    let raw = std::env::args().nth(1);
    let (args, errors) = AgentArgs::parse(raw.as_deref());
    init_logging(args.log_format);

    info!("[Demo] mode: {}", args.mode);

    let table = Arc::new(WrapperTable::new());
    let listener = if args.verbose {
        StreamListener::new(true)
    } else {
        StreamListener::transformations_only()
    };
    let agent = Agent::builder()
        .registry(args.registry())
        .substrate(table.clone())
        .listener(listener)
        .build();
    agent.report_configuration_errors(&errors);

    let heartbeat = if args.heartbeat.enabled {
        match Heartbeat::start(args.heartbeat.clone()) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("[Demo] heartbeat not started: {}", e);
                None
            }
        }
    } else {
        None
    };

    let types = services::discovered_types();
    agent.discover_all(&types, LoaderId::new(1));
    info!("[Demo] {} methods instrumented", table.len());

    let failures = exercise(&Host::new(table));
    info!("[Demo] {} ({} calls failed)", agent.report(), failures);

    if let Some(handle) = heartbeat {
        handle.stop();
    }

    if agent.report().failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
