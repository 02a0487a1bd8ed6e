use std::sync::Arc;

use iconpack_engine::{
    CacheKey, ComponentName, Drawable, EngineConfig, ICON_PACK_ACTIONS, IconsHandler, ItemIdentity,
    JsonPreferenceStore, LayerRole, MemoryHost, MemoryPackResources, PackSwitchCoordinator,
    PreferenceStore, SwitchError,
};
use tempfile::{TempDir, tempdir};
use tokio::runtime::Handle;

const PACK: &str = "com.mapped.pack";

struct Fixture {
    dir: TempDir,
    host: Arc<MemoryHost>,
    prefs: Arc<JsonPreferenceStore>,
    coordinator: PackSwitchCoordinator,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let host = Arc::new(MemoryHost::new());
    host.install_app("com.example", "Example", Drawable::solid(32, [200, 100, 0, 255]));
    host.install_pack(
        "Mapped",
        ICON_PACK_ACTIONS[2],
        Some(Drawable::placeholder(8)),
        Arc::new(
            MemoryPackResources::new(PACK)
                .with_xml(
                    "appfilter",
                    r#"<resources><item component="ComponentInfo{com.example/com.example.Main}" drawable="themed"/></resources>"#,
                )
                .with_drawable("themed", Drawable::solid(16, [0, 0, 0, 255])),
        ),
    );

    let handler = Arc::new(IconsHandler::new(
        EngineConfig::default().with_cache_dir(dir.path().join("cache")),
        host.clone(),
    ));
    handler.all_icon_packs();
    let prefs = Arc::new(JsonPreferenceStore::new(dir.path().join("prefs.json")));
    let coordinator = PackSwitchCoordinator::new(
        handler,
        prefs.clone(),
        host.clone(),
        host.clone(),
        Handle::current(),
    );
    Fixture {
        dir,
        host,
        prefs,
        coordinator,
    }
}

fn main_item() -> ItemIdentity {
    ItemIdentity::for_system_user(ComponentName::new("com.example", "com.example.Main"))
}

#[tokio::test(flavor = "multi_thread")]
async fn switching_applies_the_pack() {
    let f = fixture();
    let handler = f.coordinator.handler().clone();
    let unthemed = handler.resolve_icon(&main_item());

    let state = f
        .coordinator
        .switch_icon_packs(PACK, false)
        .unwrap()
        .wait()
        .await
        .unwrap();
    assert_eq!(state.package(), PACK);
    assert!(!handler.is_default_icon_pack());

    let themed = handler.resolve_icon(&main_item());
    assert_eq!(themed, Drawable::solid(16, [0, 0, 0, 255]));
    assert_ne!(themed, unthemed);
    assert_eq!(f.prefs.icon_pack().unwrap().as_deref(), Some(PACK));
    assert_eq!(f.host.reload_count(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn switching_to_the_active_pack_turns_theming_off() {
    let f = fixture();
    let handler = f.coordinator.handler().clone();
    let before = handler.resolve_icon(&main_item());

    f.coordinator.switch_icon_packs(PACK, false).unwrap().wait().await.unwrap();
    let toggled = f.coordinator.switch_icon_packs(PACK, false).unwrap();
    assert_eq!(toggled.package(), "default");
    toggled.wait().await.unwrap();

    assert!(handler.is_default_icon_pack());
    assert_eq!(handler.resolve_icon(&main_item()), before);
    assert_eq!(f.prefs.icon_pack().unwrap().as_deref(), Some("default"));
    assert_eq!(f.host.clear_count(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn update_reparses_and_clears_cache() {
    let f = fixture();
    let handler = f.coordinator.handler().clone();
    f.coordinator.switch_icon_packs(PACK, false).unwrap().wait().await.unwrap();
    handler.resolve_icon(&main_item());
    let key = CacheKey::new(PACK, &main_item().component, LayerRole::None);
    assert!(handler.cache().contains(&key));

    let task = f.coordinator.switch_icon_packs(PACK, true).unwrap();
    assert_eq!(task.package(), PACK);
    task.wait().await.unwrap();
    assert_eq!(handler.current_icon_pack(), PACK);
    assert!(!handler.cache().contains(&key));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_pack_is_rejected() {
    let f = fixture();
    let result = f.coordinator.switch_icon_packs("com.not.installed", false);
    assert!(matches!(result, Err(SwitchError::Rejected(_))));
    assert_eq!(f.prefs.icon_pack().unwrap(), None);
    assert!(!f.dir.path().join("prefs.json").exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn restart_restores_the_persisted_pack() {
    let f = fixture();
    f.coordinator.switch_icon_packs(PACK, false).unwrap().wait().await.unwrap();

    let restarted = IconsHandler::from_preferences(
        EngineConfig::default().with_cache_dir(f.dir.path().join("cache")),
        f.host.clone(),
        f.prefs.as_ref(),
    );
    assert_eq!(restarted.current_icon_pack(), PACK);
    assert_eq!(restarted.resolve_icon(&main_item()), Drawable::solid(16, [0, 0, 0, 255]));
}
