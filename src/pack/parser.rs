//! Parsing of icon pack metadata documents.
//!
//! Two third-party formats are understood:
//!
//! - **appfilter**: `<iconback img1=".." img2=".."/>`, `<iconmask img1=".."/>`,
//!   `<iconupon img1=".."/>`, `<scale factor=".."/>` and repeated
//!   `<item component="ComponentInfo{pkg/cls}" drawable=".."/>` elements.
//! - **drawable**: a flat listing of `<item drawable=".."/>` elements.
//!
//! Both are parsed permissively: unknown elements and attributes are
//! skipped. A malformed document never aborts pack loading; the parse is
//! reported as [`ParseOutcome::Failed`] and contributes nothing.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::resources::PackResources;
use crate::error::ParseError;
use crate::layer::{LayerAssets, MAX_SCALE_FACTOR};

/// Name of the component-to-drawable mapping document.
pub const APPFILTER_DOCUMENT: &str = "appfilter";

/// Name of the flat drawable listing document.
pub const DRAWABLE_DOCUMENT: &str = "drawable";

// ============================================================================
// Parsed tables
// ============================================================================

/// Component identity string to drawable name. The first mapping seen for a
/// component wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppFilterTable {
    entries: HashMap<String, String>,
}

impl AppFilterTable {
    /// Records a mapping unless the component is already mapped.
    ///
    /// Returns true if the mapping was recorded.
    pub fn insert_first(&mut self, component: impl Into<String>, drawable: impl Into<String>) -> bool {
        let component = component.into();
        if self.entries.contains_key(&component) {
            return false;
        }
        self.entries.insert(component, drawable.into());
        true
    }

    pub fn get(&self, component: &str) -> Option<&str> {
        self.entries.get(component).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, d)| (c.as_str(), d.as_str()))
    }
}

/// Distinct drawable names offered by a pack, in document order until
/// sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawableCatalog {
    names: Vec<String>,
}

impl DrawableCatalog {
    /// Appends `name` unless it is already present (exact comparison).
    pub fn push_unique(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.names.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Sorts names case-insensitively.
    pub fn sort(&mut self) {
        self.names
            .sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn into_names(self) -> Vec<String> {
        self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names that loosely match an application label.
    ///
    /// Both sides are reduced to lowercase ASCII letters; a name matches when
    /// its reduced form is longer than two letters and either form contains
    /// the other. A label with no ASCII letters contains every name.
    pub fn matching(&self, label: &str) -> Vec<String> {
        let label = letters_only(label);
        self.names
            .iter()
            .filter(|name| {
                let filtered = letters_only(name);
                filtered.len() > 2 && (label.contains(&filtered) || filtered.contains(&label))
            })
            .cloned()
            .collect()
    }
}

fn letters_only(s: &str) -> String {
    s.chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// Outcomes
// ============================================================================

/// Which branch a document parse took.
#[derive(Debug)]
pub enum ParseOutcome {
    /// The document was present and well-formed.
    Parsed,
    /// The pack does not ship the document.
    Absent,
    /// The document could not be read; its contribution was discarded.
    Failed(ParseError),
}

impl ParseOutcome {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed)
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Result of a full-mode parse.
#[derive(Debug)]
pub struct FilterParse {
    pub table: AppFilterTable,
    pub layers: LayerAssets,
    pub outcome: ParseOutcome,
}

impl FilterParse {
    fn empty(outcome: ParseOutcome) -> Self {
        Self {
            table: AppFilterTable::default(),
            layers: LayerAssets::default(),
            outcome,
        }
    }
}

/// Where a drawable catalog came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSource {
    /// The flat drawable listing.
    DrawableListing,
    /// Drawable names of appfilter items, used when the listing is absent or
    /// malformed.
    AppFilterFallback,
    /// Neither document yielded anything usable.
    Empty,
}

/// Result of a fallback-mode parse.
#[derive(Debug)]
pub struct CatalogParse {
    pub catalog: DrawableCatalog,
    pub source: CatalogSource,
    /// Why the flat listing was not used, if it failed to parse.
    pub listing_error: Option<ParseError>,
}

/// Selects what [`PackMetadataParser::parse`] reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// Appfilter mapping table plus layer assets.
    Full,
    /// Drawable catalog for browsing.
    Fallback,
}

/// Output of [`PackMetadataParser::parse`].
#[derive(Debug)]
pub enum PackMetadata {
    Full(FilterParse),
    Fallback(CatalogParse),
}

// ============================================================================
// PackMetadataParser
// ============================================================================

/// Reads the metadata documents of one pack.
pub struct PackMetadataParser<'a> {
    resources: &'a dyn PackResources,
}

impl<'a> PackMetadataParser<'a> {
    pub fn new(resources: &'a dyn PackResources) -> Self {
        Self { resources }
    }

    pub fn parse(&self, mode: ParseMode) -> PackMetadata {
        match mode {
            ParseMode::Full => PackMetadata::Full(self.parse_filter()),
            ParseMode::Fallback => PackMetadata::Fallback(self.parse_catalog()),
        }
    }

    /// Parses the appfilter document into a mapping table and layer assets.
    pub fn parse_filter(&self) -> FilterParse {
        let pack = self.resources.package();
        let bytes = match self.resources.xml(APPFILTER_DOCUMENT) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return FilterParse::empty(ParseOutcome::Absent),
            Err(e) => {
                tracing::warn!(pack, error = %e, "unable to read appfilter document");
                return FilterParse::empty(ParseOutcome::Failed(ParseError::MissingResources(
                    pack.to_string(),
                )));
            }
        };

        let mut table = AppFilterTable::default();
        let mut layers = LayerAssets::default();
        let result = for_each_element(&bytes, APPFILTER_DOCUMENT, |element, attributes| {
            match element {
                "iconback" => {
                    for (name, value) in attributes {
                        if name.starts_with("img") {
                            if let Some(image) = self.resources.bitmap(value) {
                                layers.back_images.push(image);
                            }
                        }
                    }
                }
                "iconmask" => {
                    if let Some(value) = first_attribute(attributes, "img1") {
                        layers.mask_image = self.resources.bitmap(value);
                    }
                }
                "iconupon" => {
                    if let Some(value) = first_attribute(attributes, "img1") {
                        layers.front_image = self.resources.bitmap(value);
                    }
                }
                "scale" => {
                    if let Some(value) = first_attribute(attributes, "factor") {
                        match value.trim().parse::<f32>() {
                            Ok(factor) if factor > 0.0 && factor <= MAX_SCALE_FACTOR => {
                                layers.scale_factor = factor
                            }
                            _ => {
                                let error = ParseError::InvalidAttribute {
                                    element: element.to_string(),
                                    attribute: "factor".to_string(),
                                    value: value.to_string(),
                                };
                                tracing::warn!(pack, error = %error, "ignoring scale factor");
                            }
                        }
                    }
                }
                "item" => {
                    let component = attribute(attributes, "component");
                    let drawable = attribute(attributes, "drawable");
                    if let (Some(component), Some(drawable)) = (component, drawable) {
                        table.insert_first(component, drawable);
                    }
                }
                _ => {}
            }
        });

        match result {
            Ok(()) => {
                tracing::debug!(
                    pack,
                    components = table.len(),
                    backs = layers.back_images.len(),
                    scale = layers.scale_factor,
                    "parsed appfilter"
                );
                FilterParse {
                    table,
                    layers,
                    outcome: ParseOutcome::Parsed,
                }
            }
            Err(e) => {
                tracing::warn!(pack, error = %e, "error parsing appfilter, pack contributes nothing");
                FilterParse::empty(ParseOutcome::Failed(e))
            }
        }
    }

    /// Parses the flat drawable listing. `Ok(None)` when the pack has none.
    pub fn parse_drawable_listing(&self) -> Result<Option<DrawableCatalog>, ParseError> {
        let pack = self.resources.package();
        let bytes = match self.resources.xml(DRAWABLE_DOCUMENT) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(pack, error = %e, "unable to read drawable listing");
                return Err(ParseError::MissingResources(pack.to_string()));
            }
        };
        self.collect_item_drawables(&bytes, DRAWABLE_DOCUMENT).map(Some)
    }

    /// Reads appfilter `item` elements as a list of drawable names.
    pub fn parse_appfilter_drawables(&self) -> Result<Option<DrawableCatalog>, ParseError> {
        let pack = self.resources.package();
        let bytes = match self.resources.xml(APPFILTER_DOCUMENT) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(None),
            Err(e) => {
                tracing::warn!(pack, error = %e, "unable to read appfilter document");
                return Err(ParseError::MissingResources(pack.to_string()));
            }
        };
        self.collect_item_drawables(&bytes, APPFILTER_DOCUMENT).map(Some)
    }

    /// Builds the browsing catalog: the flat listing when it parses, the
    /// appfilter items otherwise.
    pub fn parse_catalog(&self) -> CatalogParse {
        let pack = self.resources.package();
        let listing_error = match self.parse_drawable_listing() {
            Ok(Some(catalog)) => {
                return CatalogParse {
                    catalog,
                    source: CatalogSource::DrawableListing,
                    listing_error: None,
                };
            }
            Ok(None) => {
                tracing::info!(pack, "no drawable listing, trying appfilter");
                None
            }
            Err(e) => {
                tracing::info!(pack, error = %e, "error parsing drawable listing, trying appfilter");
                Some(e)
            }
        };

        match self.parse_appfilter_drawables() {
            Ok(Some(catalog)) => CatalogParse {
                catalog,
                source: CatalogSource::AppFilterFallback,
                listing_error,
            },
            Ok(None) => CatalogParse {
                catalog: DrawableCatalog::default(),
                source: CatalogSource::Empty,
                listing_error,
            },
            Err(e) => {
                tracing::warn!(pack, error = %e, "error parsing appfilter items");
                CatalogParse {
                    catalog: DrawableCatalog::default(),
                    source: CatalogSource::Empty,
                    listing_error,
                }
            }
        }
    }

    /// Collects `drawable` attributes of `item` elements that name a real
    /// image resource.
    fn collect_item_drawables(
        &self,
        bytes: &[u8],
        document: &'static str,
    ) -> Result<DrawableCatalog, ParseError> {
        let mut catalog = DrawableCatalog::default();
        for_each_element(bytes, document, |element, attributes| {
            if element != "item" {
                return;
            }
            if let Some(name) = attribute(attributes, "drawable") {
                if !catalog.contains(name) && self.resources.has_drawable(name) {
                    catalog.push_unique(name);
                }
            }
        })?;
        Ok(catalog)
    }
}

// ============================================================================
// Markup walking
// ============================================================================

/// Calls `visit` with the local name and attributes of every element.
fn for_each_element<F>(bytes: &[u8], document: &'static str, mut visit: F) -> Result<(), ParseError>
where
    F: FnMut(&str, &[(String, String)]),
{
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                let attributes = collect_attributes(e, document, reader.buffer_position() as u64)?;
                visit(&name, &attributes);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ParseError::Xml {
                    document,
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
        }
        buf.clear();
    }
    Ok(())
}

fn collect_attributes(
    element: &BytesStart<'_>,
    document: &'static str,
    position: u64,
) -> Result<Vec<(String, String)>, ParseError> {
    let mut attributes = Vec::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ParseError::Xml {
            document,
            position,
            message: e.to_string(),
        })?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| ParseError::Xml {
            document,
            position,
            message: e.to_string(),
        })?;
        attributes.push((key, value.into_owned()));
    }
    Ok(attributes)
}

fn attribute<'s>(attributes: &'s [(String, String)], name: &str) -> Option<&'s str> {
    attributes
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// The value of the first attribute, if it is named `name`.
fn first_attribute<'s>(attributes: &'s [(String, String)], name: &str) -> Option<&'s str> {
    attributes
        .first()
        .filter(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::Drawable;
    use crate::pack::resources::MemoryPackResources;

    const APPFILTER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <!-- layers -->
    <iconback img1="back_a" img2="back_b" img3="missing"/>
    <iconmask img1="mask"/>
    <iconupon img1="front"/>
    <scale factor="0.5"/>
    <unknown something="else"/>
    <item component="ComponentInfo{com.example/com.example.Main}" drawable="example"/>
    <item component="ComponentInfo{com.example/com.example.Main}" drawable="example_alt"/>
    <item component="ComponentInfo{com.clock/com.clock.Clock}" drawable="clock"/>
    <item drawable="orphan"/>
</resources>"#;

    fn pack() -> MemoryPackResources {
        MemoryPackResources::new("com.pack")
            .with_xml(APPFILTER_DOCUMENT, APPFILTER)
            .with_drawable("back_a", Drawable::solid(4, [1, 1, 1, 255]))
            .with_drawable("back_b", Drawable::solid(4, [2, 2, 2, 255]))
            .with_drawable("mask", Drawable::solid(4, [0, 0, 0, 255]))
            .with_drawable("front", Drawable::placeholder(4))
            .with_drawable("example", Drawable::solid(4, [3, 3, 3, 255]))
            .with_drawable("clock", Drawable::solid(4, [4, 4, 4, 255]))
    }

    #[test]
    fn full_parse_reads_layers_and_first_mapping_wins() {
        let resources = pack();
        let parsed = PackMetadataParser::new(&resources).parse_filter();

        assert!(parsed.outcome.is_parsed());
        assert_eq!(parsed.table.len(), 2);
        assert_eq!(
            parsed.table.get("ComponentInfo{com.example/com.example.Main}"),
            Some("example")
        );
        assert_eq!(parsed.layers.back_images.len(), 2);
        assert!(parsed.layers.mask_image.is_some());
        assert!(parsed.layers.front_image.is_some());
        assert_eq!(parsed.layers.scale_factor, 0.5);
    }

    #[test]
    fn absent_appfilter_is_silently_empty() {
        let resources = MemoryPackResources::new("com.pack");
        let parsed = PackMetadataParser::new(&resources).parse_filter();

        assert!(parsed.outcome.is_absent());
        assert!(parsed.table.is_empty());
        assert_eq!(parsed.layers, LayerAssets::default());
    }

    #[test]
    fn malformed_appfilter_contributes_nothing() {
        let resources = MemoryPackResources::new("com.pack")
            .with_xml(
                APPFILTER_DOCUMENT,
                r#"<resources><item component="ComponentInfo{a/a.B}" drawable="x"/><iconback img1="y"></resources>"#,
            )
            .with_drawable("x", Drawable::placeholder(2));
        let parsed = PackMetadataParser::new(&resources).parse_filter();

        assert!(matches!(parsed.outcome, ParseOutcome::Failed(ParseError::Xml { .. })));
        assert!(parsed.table.is_empty());
        assert!(!parsed.layers.has_back_images());
    }

    #[test]
    fn mask_requires_img1_as_first_attribute() {
        let resources = MemoryPackResources::new("com.pack")
            .with_xml(APPFILTER_DOCUMENT, r#"<resources><iconmask img2="mask" img1="mask"/></resources>"#)
            .with_drawable("mask", Drawable::placeholder(2));
        let parsed = PackMetadataParser::new(&resources).parse_filter();
        assert!(parsed.layers.mask_image.is_none());
    }

    #[test]
    fn invalid_scale_keeps_default() {
        let resources = MemoryPackResources::new("com.pack")
            .with_xml(APPFILTER_DOCUMENT, r#"<resources><scale factor="big"/></resources>"#);
        let parsed = PackMetadataParser::new(&resources).parse_filter();
        assert!(parsed.outcome.is_parsed());
        assert_eq!(parsed.layers.scale_factor, 1.0);
    }

    #[test]
    fn oversized_scale_is_rejected() {
        for factor in ["1e10", "inf", "2.5"] {
            let resources = MemoryPackResources::new("com.pack").with_xml(
                APPFILTER_DOCUMENT,
                format!(r#"<resources><scale factor="{factor}"/></resources>"#),
            );
            let parsed = PackMetadataParser::new(&resources).parse_filter();
            assert!(parsed.outcome.is_parsed(), "factor {factor}");
            assert_eq!(parsed.layers.scale_factor, 1.0, "factor {factor}");
        }

        let resources = MemoryPackResources::new("com.pack")
            .with_xml(APPFILTER_DOCUMENT, r#"<resources><scale factor="2"/></resources>"#);
        let parsed = PackMetadataParser::new(&resources).parse_filter();
        assert_eq!(parsed.layers.scale_factor, 2.0);
    }

    #[test]
    fn listing_keeps_only_real_drawables_once() {
        let resources = MemoryPackResources::new("com.pack")
            .with_xml(
                DRAWABLE_DOCUMENT,
                r#"<resources><category title="All"/><item drawable="clock"/><item drawable="ghost"/><item drawable="clock"/><item drawable="Alarm"/></resources>"#,
            )
            .with_drawable("clock", Drawable::placeholder(2))
            .with_drawable("Alarm", Drawable::placeholder(2));

        let parsed = PackMetadataParser::new(&resources).parse_catalog();
        assert_eq!(parsed.source, CatalogSource::DrawableListing);
        assert_eq!(parsed.catalog.names(), ["clock", "Alarm"]);

        let mut sorted = parsed.catalog.clone();
        sorted.sort();
        assert_eq!(sorted.names(), ["Alarm", "clock"]);
    }

    #[test]
    fn malformed_listing_falls_back_to_appfilter_items() {
        let resources = pack().with_xml(DRAWABLE_DOCUMENT, "<resources><item drawable=\"clock\"");
        let parsed = PackMetadataParser::new(&resources).parse(ParseMode::Fallback);

        let PackMetadata::Fallback(parsed) = parsed else {
            panic!("expected a catalog parse");
        };
        assert_eq!(parsed.source, CatalogSource::AppFilterFallback);
        assert!(parsed.listing_error.is_some());
        assert_eq!(parsed.catalog.names(), ["example", "clock"]);
    }

    #[test]
    fn missing_documents_give_empty_catalog() {
        let resources = MemoryPackResources::new("com.pack");
        let parsed = PackMetadataParser::new(&resources).parse_catalog();
        assert_eq!(parsed.source, CatalogSource::Empty);
        assert!(parsed.catalog.is_empty());
    }

    #[test]
    fn fuzzy_matching_strips_non_letters() {
        let mut catalog = DrawableCatalog::default();
        for name in ["com.example.icon_app", "ab", "calendar_2", "icon_app_2"] {
            catalog.push_unique(name);
        }

        assert_eq!(catalog.matching("Icon App"), ["com.example.icon_app", "icon_app_2"]);
        assert_eq!(catalog.matching("Calendar"), ["calendar_2"]);
        assert_eq!(
            catalog.matching("123"),
            ["com.example.icon_app", "calendar_2", "icon_app_2"]
        );
    }

    #[test]
    fn label_without_ascii_letters_matches_every_long_name() {
        let mut catalog = DrawableCatalog::default();
        for name in ["clock", "calendar", "tv"] {
            catalog.push_unique(name);
        }
        assert_eq!(catalog.matching("时钟"), ["clock", "calendar"]);
    }
}
