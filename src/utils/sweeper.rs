use std::future::Future;
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// 周期任务的持有者。
///
/// 定时循环不再以游离的 `tokio::spawn` 形式存在，而是挂在一个显式的
/// 控制器上：`start` 启动，`stop` 立刻中止定时器任务。中止是确定性的，
/// 不会再触发下一次 tick。
pub struct Sweeper {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    /// 启动周期任务。重复调用会先停掉已在运行的任务。
    pub fn start<F, Fut>(&self, period: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send,
    {
        self.stop();

        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            // 第一次 tick 立即完成，跳过它以保证严格的周期间隔
            timer.tick().await;
            loop {
                timer.tick().await;
                debug!("Sweeper {} tick", name);
                tick().await;
            }
        });

        *self.handle.lock().unwrap() = Some(handle);
        info!("Sweeper {} started", self.name);
    }

    /// 停止周期任务；没有运行中的任务时为无操作。
    pub fn stop(&self) {
        if let Some(handle) = self.handle.lock().unwrap().take() {
            handle.abort();
            info!("Sweeper {} stopped", self.name);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .unwrap()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_sweeper_runs_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let sweeper = Sweeper::new("test");

        let c = counter.clone();
        sweeper.start(Duration::from_millis(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        sweeper.stop();
        assert!(counter.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_sweeper_stop_is_deterministic() {
        let counter = Arc::new(AtomicUsize::new(0));
        let sweeper = Sweeper::new("test-stop");

        let c = counter.clone();
        sweeper.start(Duration::from_millis(10), move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        sweeper.stop();
        assert!(!sweeper.is_running());

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        // 停止后不再产生任何 tick
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_sweeper_stop_without_start_is_noop() {
        let sweeper = Sweeper::new("idle");
        sweeper.stop();
        assert!(!sweeper.is_running());
    }
}
