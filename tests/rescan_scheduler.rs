//! 重扫调度集成测试
//!
//! 使用暂停的 tokio 时钟验证去抖：插入节点后等待间隔结束才重跑规则集

use std::time::Duration;

use tokio::task::LocalSet;

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{HtmlTestHelper, TestEnvironment};

#[tokio::test(start_paused = true)]
async fn test_inserted_content_is_localized_after_debounce() {
    LocalSet::new()
        .run_until(async {
            let env = TestEnvironment::default();
            env.localizer.run();
            env.localizer.observe_changes();

            let header = HtmlTestHelper::select(&env.document, "header.AppHeader");
            let label = env
                .document
                .create_element("span", &[("class", "AppHeader-context-item-label")]);
            env.document
                .append_child(&label, &env.document.create_text("Dashboard"));
            env.document.append_child(&header, &label);

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(env.localizer.stats().passes, 1);

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(env.localizer.stats().passes, 2);
            assert_eq!(
                dom_localizer::normalize_text(&dom_localizer::dom::text_content(&label)),
                "Главная"
            );
            assert!(env.localizer.guards().is_guarded(&label));

            // 引擎自己的插入会触发一次收尾重扫，之后不再有新的改动
            tokio::time::sleep(Duration::from_millis(500)).await;
            assert_eq!(env.localizer.stats().passes, 3);
            assert_eq!(env.localizer.stats().elements_changed, 8);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_insertion_bursts_coalesce() {
    LocalSet::new()
        .run_until(async {
            let env = TestEnvironment::default();
            env.localizer.observe_changes();
            let main = HtmlTestHelper::select(&env.document, "main");

            for _ in 0..10 {
                let row = env.document.create_element("p", &[("class", "feed-row")]);
                env.document.append_child(&main, &row);
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            assert_eq!(env.localizer.stats().passes, 0);

            tokio::time::sleep(Duration::from_millis(100)).await;
            assert_eq!(env.localizer.stats().passes, 1);
            assert_eq!(env.text("h2.greeting"), "Доброе утро, octocat!");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_observing_cancels_rescan() {
    LocalSet::new()
        .run_until(async {
            let env = TestEnvironment::default();
            env.localizer.observe_changes();
            let main = HtmlTestHelper::select(&env.document, "main");

            env.document
                .append_child(&main, &env.document.create_element("p", &[]));
            env.localizer.stop_observing();

            tokio::time::sleep(Duration::from_millis(500)).await;
            assert_eq!(env.localizer.stats().passes, 0);
            assert_eq!(env.text("h2.greeting"), "Good morning, octocat!");
        })
        .await;
}
