use anyhow::{Context, Result};
use image::GrayImage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Semantic names of the UI elements the classifier knows about.
pub mod ui {
    pub const PLAY_BUTTON: &str = "Play Button";
    pub const BATTLE_INDICATOR: &str = "Battle Indicator";
    pub const OK_BUTTON: &str = "OK Button";
    pub const HOME_BUTTON: &str = "Home Button";
    /// Loaded but not used for classification.
    pub const SETTINGS_ICON: &str = "Settings Icon";
}

/// Fixed UI element names and the files they are loaded from.
pub const EXPECTED_UI_ELEMENTS: [(&str, &str); 5] = [
    (ui::PLAY_BUTTON, "play_button.png"),
    (ui::BATTLE_INDICATOR, "battle_indicator.png"),
    (ui::OK_BUTTON, "ok_button.png"),
    (ui::HOME_BUTTON, "home_button.png"),
    (ui::SETTINGS_ICON, "settings_icon.png"),
];

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Card,
    UiElement,
    EnemyUnit,
}

impl TemplateKind {
    /// Subdirectory of the templates root holding this namespace
    pub fn dir_name(&self) -> &'static str {
        match self {
            TemplateKind::Card => "cards",
            TemplateKind::UiElement => "ui_elements",
            TemplateKind::EnemyUnit => "enemy_units",
        }
    }
}

/// Immutable grayscale reference image.
///
/// Pixel sum and sum of squares are computed once so the matcher only has to
/// accumulate the cross term per alignment.
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    kind: TemplateKind,
    image: GrayImage,
    sum: u64,
    sum_sq: u64,
}

impl Template {
    pub fn new(name: impl Into<String>, kind: TemplateKind, image: GrayImage) -> Self {
        let (sum, sum_sq) = image.pixels().fold((0u64, 0u64), |(s, s2), p| {
            let v = p[0] as u64;
            (s + v, s2 + v * v)
        });
        Self {
            name: name.into(),
            kind,
            image,
            sum,
            sum_sq,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TemplateKind {
        self.kind
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub(crate) fn sum(&self) -> u64 {
        self.sum
    }

    pub(crate) fn sum_sq(&self) -> u64 {
        self.sum_sq
    }
}

/// Convert a file stem or user-supplied card name to its template key:
/// `_`/`-` become spaces and each word is title-cased ("mini_pekka" -> "Mini Pekka").
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for ch in raw.chars() {
        let ch = if ch == '_' || ch == '-' { ' ' } else { ch };
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

/// Preloaded templates in three namespaces.
///
/// Each namespace iterates in name order; scene detections inherit that order.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    cards: BTreeMap<String, Template>,
    ui_elements: BTreeMap<String, Template>,
    enemy_units: BTreeMap<String, Template>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load templates from a directory tree:
    ///   - root/cards/*.{png,jpg,jpeg}
    ///   - root/ui_elements/{play_button,battle_indicator,...}.png
    ///   - root/enemy_units/*.{png,jpg,jpeg}
    ///
    /// Missing directories and unreadable files are logged and skipped.
    pub fn load(root: &Path) -> Self {
        let mut store = Self::new();

        store.load_named_dir(&root.join(TemplateKind::Card.dir_name()), TemplateKind::Card);
        store.load_ui_dir(&root.join(TemplateKind::UiElement.dir_name()));
        store.load_named_dir(
            &root.join(TemplateKind::EnemyUnit.dir_name()),
            TemplateKind::EnemyUnit,
        );

        if store.total() == 0 {
            warn!(
                "No templates found under {}. Running with detection disabled",
                root.display()
            );
        }
        store
    }

    fn load_named_dir(&mut self, dir: &Path, kind: TemplateKind) {
        if !dir.is_dir() {
            warn!(
                "{:?} templates directory not found: {}",
                kind,
                dir.display()
            );
            return;
        }

        let paths = match list_images(dir) {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to list {}: {:#}", dir.display(), e);
                return;
            }
        };

        info!("Loading {:?} templates from {}", kind, dir.display());
        for path in paths {
            let Some(stem) = path.file_stem() else {
                continue;
            };
            let name = normalize_name(&stem.to_string_lossy());
            match load_gray(&path) {
                Ok(img) => {
                    debug!("Loaded template '{}' from {}", name, path.display());
                    self.insert(Template::new(name, kind, img));
                }
                Err(e) => warn!("Could not load image file {}: {:#}", path.display(), e),
            }
        }

        let count = self.len(kind);
        info!("Finished loading {} {:?} templates", count, kind);
        if count == 0 && kind == TemplateKind::EnemyUnit {
            warn!("No enemy unit templates loaded. Opponent unit detection disabled");
        }
    }

    fn load_ui_dir(&mut self, dir: &Path) {
        if !dir.is_dir() {
            warn!(
                "UI elements directory not found: {}. Phase detection will fall back to in-battle",
                dir.display()
            );
            return;
        }

        let mut loaded = 0;
        for (name, file) in EXPECTED_UI_ELEMENTS {
            let path = dir.join(file);
            if !path.exists() {
                warn!("Expected UI template '{}' for '{}' not found", path.display(), name);
                continue;
            }
            match load_gray(&path) {
                Ok(img) => {
                    debug!("Loaded UI template '{}' from {}", name, file);
                    self.insert(Template::new(name, TemplateKind::UiElement, img));
                    loaded += 1;
                }
                Err(e) => warn!("Could not load image file {}: {:#}", path.display(), e),
            }
        }

        info!(
            "Finished loading {} UI element templates out of {} expected",
            loaded,
            EXPECTED_UI_ELEMENTS.len()
        );
    }

    /// Add or replace a template in its namespace.
    pub fn insert(&mut self, template: Template) {
        let name = template.name().to_string();
        self.namespace_mut(template.kind()).insert(name, template);
    }

    pub fn get(&self, kind: TemplateKind, name: &str) -> Option<&Template> {
        self.namespace(kind).get(name)
    }

    pub fn card(&self, name: &str) -> Option<&Template> {
        self.get(TemplateKind::Card, name)
    }

    pub fn ui(&self, name: &str) -> Option<&Template> {
        self.get(TemplateKind::UiElement, name)
    }

    pub fn enemy_unit(&self, name: &str) -> Option<&Template> {
        self.get(TemplateKind::EnemyUnit, name)
    }

    pub fn iter(&self, kind: TemplateKind) -> impl Iterator<Item = &Template> {
        self.namespace(kind).values()
    }

    pub fn len(&self, kind: TemplateKind) -> usize {
        self.namespace(kind).len()
    }

    pub fn total(&self) -> usize {
        self.cards.len() + self.ui_elements.len() + self.enemy_units.len()
    }

    fn namespace(&self, kind: TemplateKind) -> &BTreeMap<String, Template> {
        match kind {
            TemplateKind::Card => &self.cards,
            TemplateKind::UiElement => &self.ui_elements,
            TemplateKind::EnemyUnit => &self.enemy_units,
        }
    }

    fn namespace_mut(&mut self, kind: TemplateKind) -> &mut BTreeMap<String, Template> {
        match kind {
            TemplateKind::Card => &mut self.cards,
            TemplateKind::UiElement => &mut self.ui_elements,
            TemplateKind::EnemyUnit => &mut self.enemy_units,
        }
    }
}

/// Image files directly inside `dir`, sorted by path.
fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        if is_image && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn load_gray(path: &Path) -> Result<GrayImage> {
    let img = image::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(img.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn textured(w: u32, h: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            image::Luma([((x * 31 + y * 17 + seed * 7) % 251) as u8])
        })
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("knight"), "Knight");
        assert_eq!(normalize_name("mini_pekka"), "Mini Pekka");
        assert_eq!(normalize_name("SPEAR-goblins"), "Spear Goblins");
        assert_eq!(normalize_name("Fireball"), "Fireball");
    }

    #[test]
    fn test_template_stats() {
        let img = GrayImage::from_fn(2, 1, |x, _| image::Luma([if x == 0 { 3 } else { 4 }]));
        let t = Template::new("t", TemplateKind::Card, img);
        assert_eq!(t.sum(), 7);
        assert_eq!(t.sum_sq(), 25);
        assert_eq!(t.dimensions(), (2, 1));
    }

    #[test]
    fn test_load_missing_root() {
        let store = TemplateStore::load(Path::new("/nonexistent/templates"));
        assert_eq!(store.total(), 0);
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        let cards = dir.path().join("cards");
        let ui_dir = dir.path().join("ui_elements");
        std::fs::create_dir_all(&cards).unwrap();
        std::fs::create_dir_all(&ui_dir).unwrap();

        textured(12, 10, 1).save(cards.join("mini_pekka.png")).unwrap();
        textured(12, 10, 2).save(cards.join("knight.png")).unwrap();
        std::fs::write(cards.join("notes.txt"), "not an image").unwrap();
        std::fs::write(cards.join("broken.png"), "not a png either").unwrap();
        textured(20, 8, 3).save(ui_dir.join("play_button.png")).unwrap();
        textured(20, 8, 4).save(ui_dir.join("unexpected.png")).unwrap();

        let store = TemplateStore::load(dir.path());

        let names: Vec<&str> = store.iter(TemplateKind::Card).map(|t| t.name()).collect();
        assert_eq!(names, vec!["Knight", "Mini Pekka"]);
        assert_eq!(store.card("Mini Pekka").unwrap().dimensions(), (12, 10));
        assert!(store.ui(ui::PLAY_BUTTON).is_some());
        assert_eq!(store.len(TemplateKind::UiElement), 1);
        assert_eq!(store.len(TemplateKind::EnemyUnit), 0);
    }

    #[test]
    fn test_insert_replaces_same_name() {
        let mut store = TemplateStore::new();
        store.insert(Template::new("Giant", TemplateKind::Card, textured(4, 4, 1)));
        store.insert(Template::new("Giant", TemplateKind::Card, textured(6, 6, 1)));
        store.insert(Template::new("Giant", TemplateKind::EnemyUnit, textured(5, 5, 1)));
        assert_eq!(store.len(TemplateKind::Card), 1);
        assert_eq!(store.card("Giant").unwrap().width(), 6);
        assert_eq!(store.enemy_unit("Giant").unwrap().width(), 5);
    }
}
