//! Sample business types
//!
//! Each type publishes a descriptor for discovery and routes every public
//! method through the wrapper table, the way generated glue would.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use interpose_core::{CallResult, Failure, MethodDescriptor, MethodKey, TypeDescriptor, Value};
use interpose_dispatch::WrapperTable;
use interpose_matcher::REST_CONTROLLER;

const LONG: &str = "java.lang.Long";
const STRING: &str = "java.lang.String";
const INTEGER: &str = "java.lang.Integer";
const DOUBLE: &str = "java.lang.Double";

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or_default()
}

fn method(name: &str, params: &[&str], returns: &str) -> MethodDescriptor {
    params
        .iter()
        .fold(MethodDescriptor::new(name), |m, p| m.with_parameter(*p))
        .returning(returns)
}

/// Routes calls through whatever is installed
#[derive(Clone)]
pub struct Host {
    table: Arc<WrapperTable>,
}

impl Host {
    pub fn new(table: Arc<WrapperTable>) -> Self {
        Host { table }
    }

    fn call(
        &self,
        type_name: &str,
        method: &str,
        params: &[&str],
        args: Vec<Value>,
        body: impl Fn(&[Value]) -> CallResult,
    ) -> CallResult {
        let key = MethodKey::new(type_name, method, params.iter().map(|p| p.to_string()).collect());
        self.table.invoke(&key, args, body)
    }
}

pub struct UserService(pub Host);

impl UserService {
    pub const TYPE: &'static str = "org.example.service.UserService";

    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Self::TYPE)
            .with_method(MethodDescriptor::constructor())
            .with_method(method("getUserById", &[LONG], STRING))
            .with_method(method("findUserByName", &[STRING], STRING))
            .with_method(method("saveUser", &[STRING, INTEGER], "void"))
            .with_method(method("getUserCount", &[], INTEGER))
    }

    pub fn get_user_by_id(&self, id: i64) -> CallResult {
        self.0.call(Self::TYPE, "getUserById", &[LONG], vec![id.into()], |args| {
            let id = arg(args, 0);
            tracing::info!("[UserService] query user {}", id);
            Ok(Value::from(format!("User-{}", id)))
        })
    }

    pub fn find_user_by_name(&self, name: &str) -> CallResult {
        self.0.call(Self::TYPE, "findUserByName", &[STRING], vec![name.into()], |args| {
            let name = arg(args, 0);
            tracing::info!("[UserService] find user by name {}", name);
            Ok(Value::from(format!("User: {}", name)))
        })
    }

    pub fn save_user(&self, name: &str, age: i32) -> CallResult {
        self.0.call(
            Self::TYPE,
            "saveUser",
            &[STRING, INTEGER],
            vec![name.into(), age.into()],
            |args| {
                tracing::info!("[UserService] save user name={} age={}", arg(args, 0), arg(args, 1));
                Ok(Value::Unit)
            },
        )
    }

    pub fn get_user_count(&self) -> CallResult {
        self.0.call(Self::TYPE, "getUserCount", &[], Vec::new(), |_| {
            tracing::info!("[UserService] count users");
            Ok(Value::Int(100))
        })
    }
}

pub struct OrderService(pub Host);

impl OrderService {
    pub const TYPE: &'static str = "org.example.service.OrderService";

    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Self::TYPE)
            .with_method(method("createOrder", &[STRING, DOUBLE], STRING))
            .with_method(method("cancelOrder", &[LONG], "void"))
            .with_method(method("getOrderStatus", &[LONG], STRING))
    }

    pub fn create_order(&self, product: &str, price: f64) -> CallResult {
        self.0.call(
            Self::TYPE,
            "createOrder",
            &[STRING, DOUBLE],
            vec![product.into(), price.into()],
            |args| {
                tracing::info!("[OrderService] create order product={} price={}", arg(args, 0), arg(args, 1));
                let stamp = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_millis())
                    .unwrap_or(0);
                Ok(Value::from(format!("Order-{}", stamp)))
            },
        )
    }

    /// Fails for non-positive ids
    pub fn cancel_order(&self, order_id: i64) -> CallResult {
        self.0.call(Self::TYPE, "cancelOrder", &[LONG], vec![order_id.into()], |args| {
            let id = arg(args, 0).as_int().unwrap_or(0);
            if id <= 0 {
                return Err(Failure::new("IllegalArgument", format!("no order {}", id)));
            }
            tracing::info!("[OrderService] cancel order {}", id);
            Ok(Value::Unit)
        })
    }

    pub fn get_order_status(&self, order_id: i64) -> CallResult {
        self.0.call(Self::TYPE, "getOrderStatus", &[LONG], vec![order_id.into()], |args| {
            tracing::info!("[OrderService] status of order {}", arg(args, 0));
            Ok(Value::from("PROCESSING"))
        })
    }
}

pub struct UserDao(pub Host);

impl UserDao {
    pub const TYPE: &'static str = "org.example.dao.UserDao";

    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Self::TYPE)
            .with_method(method("queryById", &[LONG], STRING))
            .with_method(method("insert", &[STRING], "void"))
            .with_method(method("update", &[LONG, STRING], "void"))
    }

    pub fn query_by_id(&self, id: i64) -> CallResult {
        self.0.call(Self::TYPE, "queryById", &[LONG], vec![id.into()], |args| {
            tracing::info!("[UserDao] select id={}", arg(args, 0));
            Ok(Value::from(format!("User from DB: {}", arg(args, 0))))
        })
    }

    pub fn insert(&self, name: &str) -> CallResult {
        self.0.call(Self::TYPE, "insert", &[STRING], vec![name.into()], |args| {
            tracing::info!("[UserDao] insert name={}", arg(args, 0));
            Ok(Value::Unit)
        })
    }

    pub fn update(&self, id: i64, name: &str) -> CallResult {
        self.0.call(
            Self::TYPE,
            "update",
            &[LONG, STRING],
            vec![id.into(), name.into()],
            |args| {
                tracing::info!("[UserDao] update id={} name={}", arg(args, 0), arg(args, 1));
                Ok(Value::Unit)
            },
        )
    }
}

pub struct HelloController(pub Host);

impl HelloController {
    pub const TYPE: &'static str = "org.example.web.HelloController";

    pub fn descriptor() -> TypeDescriptor {
        TypeDescriptor::new(Self::TYPE)
            .with_annotation(REST_CONTROLLER)
            .with_method(method("hello", &[STRING], STRING))
    }

    pub fn hello(&self, name: &str) -> CallResult {
        self.0.call(Self::TYPE, "hello", &[STRING], vec![name.into()], |args| {
            Ok(Value::from(format!("Hello, {}!", arg(args, 0))))
        })
    }
}

/// Descriptors presented to the agent, including one infrastructure type
pub fn discovered_types() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor::new("java.lang.String").with_method(method("length", &[], "int")),
        UserService::descriptor(),
        OrderService::descriptor(),
        UserDao::descriptor(),
        HelloController::descriptor(),
    ]
}
