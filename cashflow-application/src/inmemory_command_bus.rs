use crate::{
    command::Command, command_bus::CommandBus, command_handler::CommandHandler,
    context::AppContext, error::AppError,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::any::{Any, TypeId, type_name};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::Instrument;

type BoxAnySend = Box<dyn Any + Send>;

type CmdHandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<BoxAnySend, AppError>> + Send + 'a>>;

type CmdHandlerFn =
    Arc<dyn for<'a> Fn(BoxAnySend, &'a AppContext) -> CmdHandlerFuture<'a> + Send + Sync>;

/// 基于内存的 CommandBus 实现
/// - 通过 TypeId 注册不同 Command 对应的 Handler
/// - 运行时以类型擦除（Any）方式进行调度，输出在调用端还原
pub struct InMemoryCommandBus {
    handlers: DashMap<TypeId, (&'static str, CmdHandlerFn)>,
}

impl Default for InMemoryCommandBus {
    fn default() -> Self {
        Self {
            handlers: DashMap::new(),
        }
    }
}

impl InMemoryCommandBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册命令处理器；同一命令类型只允许注册一次
    pub fn register<C, H>(&self, handler: Arc<H>) -> Result<(), AppError>
    where
        C: Command,
        H: CommandHandler<C> + 'static,
    {
        let key = TypeId::of::<C>();

        if self.handlers.contains_key(&key) {
            return Err(AppError::AlreadyRegisteredCommand { command: C::NAME });
        }

        let f: CmdHandlerFn = Arc::new(move |boxed_cmd, ctx| {
            let handler = handler.clone();

            Box::pin(async move {
                // 键与闭包同一泛型 C，正常情况下 downcast 不会失败
                match boxed_cmd.downcast::<C>() {
                    Ok(cmd) => {
                        let out = handler.handle(ctx, *cmd).await?;
                        Ok(Box::new(out) as BoxAnySend)
                    }
                    Err(_) => Err(AppError::TypeMismatch {
                        expected: type_name::<C>(),
                        found: "unknown",
                    }),
                }
            })
        });

        self.handlers.insert(key, (C::NAME, f));

        Ok(())
    }

    /// 获取已注册的命令名列表（只读视图）
    pub fn registered_commands(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|e| e.value().0).collect()
    }
}

#[async_trait]
impl CommandBus for InMemoryCommandBus {
    async fn dispatch<C: Command>(&self, ctx: &AppContext, cmd: C) -> Result<C::Output, AppError> {
        let Some((_name, f)) = self.handlers.get(&TypeId::of::<C>()).map(|h| h.clone()) else {
            return Err(AppError::HandlerNotFound(C::NAME));
        };

        let span = tracing::info_span!(
            "command",
            command = C::NAME,
            request_id = ctx.request_id().unwrap_or_default()
        );

        let out = async {
            let res = (f)(Box::new(cmd), ctx).await;
            if let Err(err) = &res {
                tracing::debug!(error = %err, "command failed");
            }
            res
        }
        .instrument(span)
        .await?;

        match out.downcast::<C::Output>() {
            Ok(out) => Ok(*out),
            Err(_) => Err(AppError::TypeMismatch {
                expected: type_name::<C::Output>(),
                found: "unknown",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::task::JoinSet;

    struct Bump;

    impl Command for Bump {
        const NAME: &'static str = "Bump";
        type Output = usize;
    }

    struct BumpHandler {
        counter: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl CommandHandler<Bump> for BumpHandler {
        async fn handle(&self, _ctx: &AppContext, _cmd: Bump) -> Result<usize, AppError> {
            Ok(self.counter.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn register_and_dispatch_returns_output() {
        let bus = InMemoryCommandBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.register::<Bump, _>(Arc::new(BumpHandler {
            counter: counter.clone(),
        }))
        .unwrap();

        let ctx = AppContext::new().with_request_id("req-1");
        assert_eq!(bus.dispatch(&ctx, Bump).await.unwrap(), 1);
        assert_eq!(bus.dispatch(&ctx, Bump).await.unwrap(), 2);
        assert_eq!(bus.registered_commands(), vec!["Bump"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn not_found_error_when_unregistered() {
        let bus = InMemoryCommandBus::new();
        let err = bus.dispatch(&AppContext::default(), Bump).await.unwrap_err();
        assert!(matches!(err, AppError::HandlerNotFound("Bump")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn duplicate_registration_is_rejected() {
        let bus = InMemoryCommandBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        bus.register::<Bump, _>(Arc::new(BumpHandler {
            counter: counter.clone(),
        }))
        .unwrap();

        let err = bus
            .register::<Bump, _>(Arc::new(BumpHandler { counter }))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::AlreadyRegisteredCommand { command: "Bump" }
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_dispatch_is_safe() {
        let bus = Arc::new(InMemoryCommandBus::new());
        let counter = Arc::new(AtomicUsize::new(0));
        bus.register::<Bump, _>(Arc::new(BumpHandler {
            counter: counter.clone(),
        }))
        .unwrap();

        let mut set = JoinSet::new();
        for _ in 0..50 {
            let bus = bus.clone();
            set.spawn(async move { bus.dispatch(&AppContext::default(), Bump).await.unwrap() });
        }

        let mut results = Vec::new();
        while let Some(res) = set.join_next().await {
            results.push(res.unwrap());
        }
        results.sort_unstable();
        assert_eq!(results.first(), Some(&1));
        assert_eq!(results.last(), Some(&50));
        assert_eq!(counter.load(Ordering::SeqCst), 50);
    }
}
