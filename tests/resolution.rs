use std::fs;
use std::path::Path;
use std::sync::Arc;

use image::{Rgba, RgbaImage};
use iconpack_engine::{
    CacheKey, ComponentName, CustomIconProvider, DirectoryPackResources, Drawable, EngineConfig,
    ICON_PACK_ACTIONS, IconsHandler, ItemIdentity, LayerRole, MemoryHost, MemoryPackResources,
    PackResources,
};
use tempfile::{TempDir, tempdir};

const PACK: &str = "com.layered.pack";

fn write_png(path: &Path, image: &RgbaImage) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save(path).unwrap();
}

/// A 40x40 plate that is opaque only in a thin ring, so it counts as
/// transparent and the pack's own scale applies.
fn ring_plate() -> RgbaImage {
    let mut plate = RgbaImage::new(40, 40);
    for i in 0..40 {
        plate.put_pixel(i, 0, Rgba([90, 90, 90, 255]));
        plate.put_pixel(i, 39, Rgba([90, 90, 90, 255]));
    }
    plate
}

fn layered_pack(root: &Path) -> DirectoryPackResources {
    fs::create_dir_all(root.join("xml")).unwrap();
    fs::write(
        root.join("xml/appfilter.xml"),
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <iconback img1="plate"/>
    <iconmask img1="mask"/>
    <iconupon img1="shine"/>
    <scale factor="0.5"/>
    <item component="ComponentInfo{com.mapped/com.mapped.Main}" drawable="mapped"/>
</resources>"#,
    )
    .unwrap();
    write_png(&root.join("drawable/plate.png"), &ring_plate());
    write_png(
        &root.join("drawable/mask.png"),
        &RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255])),
    );
    let mut shine = RgbaImage::new(40, 40);
    shine.put_pixel(20, 2, Rgba([255, 255, 0, 255]));
    write_png(&root.join("drawable/shine.png"), &shine);
    write_png(
        &root.join("drawable/mapped.png"),
        &RgbaImage::from_pixel(24, 24, Rgba([0, 128, 0, 255])),
    );
    DirectoryPackResources::new(PACK, root, 64)
}

struct Fixture {
    _dir: TempDir,
    host: Arc<MemoryHost>,
    handler: Arc<IconsHandler>,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let host = Arc::new(MemoryHost::new());
    host.install_app("com.example", "Example", Drawable::solid(32, [220, 20, 20, 255]));
    host.install_app("com.mapped", "Mapped", Drawable::solid(32, [20, 20, 220, 255]));
    host.install_pack(
        "Layered",
        ICON_PACK_ACTIONS[4],
        None,
        Arc::new(layered_pack(&dir.path().join("pack"))),
    );

    let config = EngineConfig::default().with_cache_dir(dir.path().join("cache"));
    let handler = Arc::new(IconsHandler::new(config, host.clone()));
    handler.all_icon_packs();
    Fixture {
        _dir: dir,
        host,
        handler,
    }
}

fn item(flat: &str) -> ItemIdentity {
    ItemIdentity::for_system_user(ComponentName::unflatten(flat).unwrap())
}

#[test]
fn layered_pack_composes_and_caches_both_layers() {
    let f = fixture();
    f.handler.load_icon_pack(PACK);
    let main = item("com.example/.Main");

    let icon = f.handler.resolve_icon(&main);
    let Drawable::Adaptive(layers) = &icon else {
        panic!("expected an adaptive icon, got {icon:?}");
    };
    assert_eq!(*layers.background, Drawable::bitmap(ring_plate()));
    let Drawable::FixedScale { inner, .. } = layers.foreground.as_ref() else {
        panic!("foreground should be fixed-scale");
    };
    assert_eq!(inner.intrinsic_size().width, 40);

    // the icon is halved onto a plate-sized layer, then the shine goes on top
    let front = inner.to_bitmap();
    assert_eq!(front.get_pixel(20, 20).0, [220, 20, 20, 255]);
    assert_eq!(front.get_pixel(5, 20).0[3], 0);
    assert_eq!(front.get_pixel(20, 2).0, [255, 255, 0, 255]);
    assert_eq!(front.get_pixel(20, 0).0[3], 0);

    let rendered = icon.to_bitmap();
    assert_eq!(rendered.get_pixel(20, 0).0, [90, 90, 90, 255]);
    let center = rendered.get_pixel(20, 20).0;
    assert!(center[0] > 200 && center[2] < 40 && center[3] > 240, "center {center:?}");

    let cache = f.handler.cache();
    for role in [LayerRole::Front, LayerRole::Back] {
        assert!(cache.contains(&CacheKey::new(PACK, &main.component, role)));
    }
    assert!(!cache.contains(&CacheKey::new(PACK, &main.component, LayerRole::None)));
}

#[test]
fn second_resolution_is_served_from_cache() {
    let f = fixture();
    f.handler.load_icon_pack(PACK);
    let main = item("com.example/.Main");

    f.handler.resolve_icon(&main);
    let after_first = f.handler.cache().stats();
    assert_eq!(after_first.writes, 2);

    let again = f.handler.resolve_icon(&main);
    let after_second = f.handler.cache().stats();
    assert!(again.is_adaptive());
    assert_eq!(after_second.writes, after_first.writes);
    assert_eq!(after_second.hits, after_first.hits + 2);
}

#[test]
fn existing_entries_are_never_overwritten() {
    let f = fixture();
    f.handler.load_icon_pack(PACK);
    let main = item("com.example/.Main");
    f.handler.resolve_icon(&main);

    let key = CacheKey::new(PACK, &main.component, LayerRole::Back);
    let before = f.handler.cache().get(&key).unwrap();
    f.handler.cache().put(&key, b"replacement");
    assert_eq!(f.handler.cache().get(&key).unwrap(), before);
}

#[test]
fn mapped_drawable_skips_composition() {
    let f = fixture();
    f.handler.load_icon_pack(PACK);
    let mapped = item("com.mapped/.Main");

    let icon = f.handler.resolve_icon(&mapped);
    assert_eq!(icon, Drawable::solid(24, [0, 128, 0, 255]));
    let cache = f.handler.cache();
    assert!(cache.contains(&CacheKey::new(PACK, &mapped.component, LayerRole::None)));
    assert!(!cache.contains(&CacheKey::new(PACK, &mapped.component, LayerRole::Back)));
}

#[test]
fn resolution_survives_any_pack_metadata() {
    let documents = [
        "",
        "<resources>",
        "<resources><iconback img1=\"nope\"/><scale factor=\"-3\"/></resources>",
        "<resources><item component=\"garbage\" drawable=\"\"/></resources>",
        "\u{0}\u{1}not xml at all",
        r#"<resources><item component="ComponentInfo{com.example/com.example.Main}" drawable="ghost"/></resources>"#,
    ];

    for (i, document) in documents.into_iter().enumerate() {
        let dir = tempdir().expect("temp dir");
        let host = Arc::new(MemoryHost::new());
        host.install_app("com.example", "Example", Drawable::solid(16, [1, 1, 1, 255]));
        let package = format!("com.pack{i}");
        host.install_pack(
            "Pack",
            ICON_PACK_ACTIONS[0],
            None,
            Arc::new(MemoryPackResources::new(&package).with_xml("appfilter", document)),
        );
        let handler =
            IconsHandler::new(EngineConfig::default().with_cache_dir(dir.path()), host.clone());
        handler.load_icon_pack(&package);

        for flat in ["com.example/.Main", "com.unknown/.Main"] {
            let icon = handler.resolve_icon(&item(flat));
            assert!(icon.intrinsic_size().width > 0, "document {i}, item {flat}");
        }
    }
}

#[test]
fn custom_icons_take_precedence_over_the_pack() {
    let f = fixture();
    f.handler.load_icon_pack(PACK);
    let provider = CustomIconProvider::new(f.handler.clone(), f.host.clone());
    let main = item("com.example/.Main");

    let custom = Drawable::solid(12, [7, 7, 7, 255]);
    f.host.set_custom_icon(main.clone(), custom.clone());
    assert_eq!(provider.icon(&main), custom);
    assert!(provider.reset_icon(&main).is_adaptive());
}

#[test]
fn drawable_listing_drives_fuzzy_matching() {
    let dir = tempdir().expect("temp dir");
    let root = dir.path().join("listing-pack");
    fs::create_dir_all(root.join("xml")).unwrap();
    fs::write(
        root.join("xml/drawable.xml"),
        r#"<resources>
    <category title="Apps"/>
    <item drawable="com.example.icon_app"/>
    <item drawable="calculator"/>
    <item drawable="ic"/>
    <item drawable="not_shipped"/>
</resources>"#,
    )
    .unwrap();
    for name in ["com.example.icon_app", "calculator", "ic"] {
        write_png(
            &root.join(format!("drawable/{name}.png")),
            &RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 255])),
        );
    }

    let host = Arc::new(MemoryHost::new());
    host.install_app("com.example.app", "Icon App", Drawable::placeholder(8));
    let resources = DirectoryPackResources::new("com.listing.pack", &root, 64);
    assert!(resources.has_drawable("calculator"));
    host.install_pack("Listing", ICON_PACK_ACTIONS[1], None, Arc::new(resources));

    let handler =
        IconsHandler::new(EngineConfig::default().with_cache_dir(dir.path().join("cache")), host);
    let all = handler.all_drawables("com.listing.pack");
    assert_eq!(all, ["calculator", "com.example.icon_app", "ic"]);

    let matching = handler.matching_drawables("com.example.app");
    assert!(matching.contains(&"com.example.icon_app".to_string()));
    assert!(!matching.contains(&"ic".to_string()));

    let loaded = handler.load_drawable(Some("com.listing.pack"), "calculator");
    assert_eq!(loaded, Some(Drawable::solid(8, [1, 2, 3, 255])));
}
