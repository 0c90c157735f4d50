//! Models, skins and substitute textures registered per collection.
//!
//! Definitions arrive from markup at any time; the image and model data
//! behind them is only read when the collection is loaded while OpenGL is
//! the active renderer, and is dropped again when the collection unloads.

use gl::types::GLuint;
use image::RgbaImage;
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use super::capabilities;
use super::texture::{set_image_opacities, GlTexture, TextureOptions};
use crate::config::texture::TextureConfig;
use crate::utils::error::{OglError, Result};

pub const MAXIMUM_COLLECTIONS: usize = 32;
pub const MAXIMUM_CLUTS_PER_COLLECTION: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionId(u8);

impl CollectionId {
    pub fn new(raw: i32) -> Result<Self> {
        if (0..MAXIMUM_COLLECTIONS as i32).contains(&raw) {
            Ok(Self(raw as u8))
        } else {
            Err(OglError::InvalidCollection(raw))
        }
    }

    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// Which color table a skin or substitute texture applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ClutSelector {
    #[default]
    All,
    Index(u8),
}

impl ClutSelector {
    /// -1 selects every color table.
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            -1 => Ok(Self::All),
            n if (0..MAXIMUM_CLUTS_PER_COLLECTION as i32).contains(&n) => Ok(Self::Index(n as u8)),
            n => Err(OglError::InvalidClut(n)),
        }
    }

    pub fn matches(&self, clut: u8) -> bool {
        match self {
            Self::All => true,
            Self::Index(i) => *i == clut,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstituteTextureDef {
    pub collection: CollectionId,
    pub clut: ClutSelector,
    pub bitmap: u16,
    pub normal_image: Option<PathBuf>,
    pub glow_image: Option<PathBuf>,
    pub options: TextureOptions,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SkinDef {
    pub clut: ClutSelector,
    pub normal_image: Option<PathBuf>,
    pub glow_image: Option<PathBuf>,
    pub options: TextureOptions,
}

/// Miner's-light shading for models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LightType {
    /// One miner's-light calculation per model
    #[default]
    Fast,
    FastNoFade,
    /// Miner's light per vertex
    Individual,
    IndividualNoFade,
}

impl LightType {
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Fast),
            1 => Some(Self::FastNoFade),
            2 => Some(Self::Individual),
            3 => Some(Self::IndividualNoFade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceMapping {
    pub sequence: u16,
    /// `None` uses the whole model
    pub model_sequence: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDef {
    pub collection: CollectionId,
    pub sequence: u16,
    pub sequence_map: Vec<SequenceMapping>,
    pub model_file: PathBuf,
    /// Guessed from the file when absent
    pub model_type: Option<String>,
    /// Model units to internal units; negative values mirror
    pub scale: f32,
    /// Degrees about x, y, z
    pub rotation: [f32; 3],
    pub shift: [f32; 3],
    /// +1 clockwise faces visible, -1 counterclockwise, 0 both
    pub sidedness: i8,
    pub normal_type: i16,
    pub normal_split: f32,
    pub light_type: LightType,
    /// +1 farthest point, -1 nearest, 0 center
    pub depth_type: i8,
    pub skins: Vec<SkinDef>,
}

impl ModelDef {
    pub fn new(collection: CollectionId, sequence: u16, model_file: impl Into<PathBuf>) -> Self {
        Self {
            collection,
            sequence,
            sequence_map: Vec::new(),
            model_file: model_file.into(),
            model_type: None,
            scale: 1.0,
            rotation: [0.0; 3],
            shift: [0.0; 3],
            sidedness: 1,
            normal_type: 1,
            normal_split: 0.5,
            light_type: LightType::Fast,
            depth_type: 0,
            skins: Vec::new(),
        }
    }

    /// Model sequence to draw for a shape sequence, if this def covers it.
    pub fn lookup(&self, sequence: u16) -> Option<Option<u16>> {
        if self.sequence == sequence {
            return Some(None);
        }
        self.sequence_map
            .iter()
            .find(|m| m.sequence == sequence)
            .map(|m| m.model_sequence)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
    pub normals: Vec<f32>,
    pub tex_coords: Vec<f32>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// Reads model files; the formats themselves live outside this crate.
pub trait ModelLoader: Send + Sync {
    fn load(&self, def: &ModelDef, path: &Path) -> Result<Model>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkinLayer {
    Normal,
    Glowing,
}

#[derive(Debug, Clone)]
pub struct LoadedSkin {
    pub def: SkinDef,
    pub normal: Option<RgbaImage>,
    pub glow: Option<RgbaImage>,
}

#[derive(Debug, Default)]
pub struct SkinManager {
    skins: Vec<LoadedSkin>,
    ids: HashMap<(u8, SkinLayer), GLuint>,
}

impl SkinManager {
    pub fn new(defs: &[SkinDef]) -> Self {
        Self {
            skins: defs
                .iter()
                .map(|def| LoadedSkin { def: def.clone(), normal: None, glow: None })
                .collect(),
            ids: HashMap::new(),
        }
    }

    /// First skin for this color table, or one that covers all of them.
    pub fn get_skin(&self, clut: u8) -> Option<&LoadedSkin> {
        self.skins.iter().find(|s| s.def.clut.matches(clut))
    }

    /// Binds the texture for a skin; returns true when its image still has
    /// to be uploaded.
    pub fn use_skin(&mut self, clut: u8, layer: SkinLayer) -> bool {
        let mut needs_load = false;
        let id = *self.ids.entry((clut, layer)).or_insert_with(|| {
            needs_load = true;
            let mut id = 0;
            if gl::GenTextures::is_loaded() {
                unsafe { gl::GenTextures(1, &mut id) };
            }
            id
        });
        if id != 0 {
            unsafe { gl::BindTexture(gl::TEXTURE_2D, id) };
        }
        needs_load
    }

    pub fn in_use(&self) -> usize {
        self.ids.len()
    }

    /// Forgets all skin textures so they get reloaded; `clear_gl` also
    /// deletes them, which needs a live context.
    pub fn reset(&mut self, clear_gl: bool) {
        if clear_gl && gl::DeleteTextures::is_loaded() {
            for id in self.ids.values().filter(|id| **id != 0) {
                unsafe { gl::DeleteTextures(1, id) };
            }
        }
        self.ids.clear();
    }

    fn load_images(&mut self, base_dir: &Path) -> usize {
        let mut loaded = 0;
        for skin in &mut self.skins {
            let options = skin.def.options;
            skin.normal = load_optional_image(base_dir, skin.def.normal_image.as_deref(), &options);
            skin.glow = load_optional_image(base_dir, skin.def.glow_image.as_deref(), &options);
            loaded += skin.normal.is_some() as usize + skin.glow.is_some() as usize;
        }
        loaded
    }

    fn unload_images(&mut self) {
        for skin in &mut self.skins {
            skin.normal = None;
            skin.glow = None;
        }
    }
}

#[derive(Debug)]
pub struct ModelData {
    pub def: ModelDef,
    pub model: Model,
    pub skins: SkinManager,
}

impl ModelData {
    fn new(def: ModelDef) -> Self {
        let skins = SkinManager::new(&def.skins);
        Self { def, model: Model::new(), skins }
    }

    pub fn is_present(&self) -> bool {
        self.model.is_present()
    }
}

pub struct SubstituteTexture {
    pub def: SubstituteTextureDef,
    pub normal: Option<RgbaImage>,
    pub glow: Option<RgbaImage>,
    uploaded: Option<GlTexture>,
}

impl SubstituteTexture {
    fn new(def: SubstituteTextureDef) -> Self {
        Self { def, normal: None, glow: None, uploaded: None }
    }

    pub fn is_loaded(&self) -> bool {
        self.normal.is_some()
    }

    /// Uploads the normal image on first use after a load or reset.
    pub fn gl_texture(&mut self, config: &TextureConfig, anisotropy_level: f32) -> Result<Option<&GlTexture>> {
        if self.uploaded.is_none() {
            if let Some(image) = &self.normal {
                self.uploaded = Some(GlTexture::upload(image, config, anisotropy_level)?);
            }
        }
        Ok(self.uploaded.as_ref())
    }
}

#[derive(Default)]
pub struct CollectionResources {
    pub textures: Vec<SubstituteTexture>,
    pub models: Vec<ModelData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub models: usize,
    pub images: usize,
    pub failures: usize,
}

#[derive(Default)]
pub struct OglResources {
    collections: BTreeMap<CollectionId, CollectionResources>,
    base_dir: PathBuf,
    loader: Option<Box<dyn ModelLoader>>,
    texture_generation: u64,
}

fn load_image(path: &Path, options: &TextureOptions) -> Result<RgbaImage> {
    let mut image = image::open(path)?.to_rgba8();
    set_image_opacities(options, &mut image);
    Ok(image)
}

fn load_optional_image(base_dir: &Path, path: Option<&Path>, options: &TextureOptions) -> Option<RgbaImage> {
    let path = base_dir.join(path?);
    match load_image(&path, options) {
        Ok(image) => Some(image),
        Err(e) => {
            warn!("Failed to load image {}: {}", path.display(), e);
            None
        }
    }
}

impl OglResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory that relative image and model paths resolve against.
    pub fn set_base_dir(&mut self, dir: impl Into<PathBuf>) {
        self.base_dir = dir.into();
    }

    pub fn set_model_loader(&mut self, loader: Box<dyn ModelLoader>) {
        self.loader = Some(loader);
    }

    pub fn texture_generation(&self) -> u64 {
        self.texture_generation
    }

    pub fn collection(&self, collection: CollectionId) -> Option<&CollectionResources> {
        self.collections.get(&collection)
    }

    /// Replaces any texture for the same collection, CLUT and bitmap.
    pub fn add_texture(&mut self, def: SubstituteTextureDef) {
        let entry = self.collections.entry(def.collection).or_default();
        entry
            .textures
            .retain(|t| !(t.def.clut == def.clut && t.def.bitmap == def.bitmap));
        entry.textures.push(SubstituteTexture::new(def));
    }

    /// Replaces any model for the same collection and sequence.
    pub fn add_model(&mut self, def: ModelDef) {
        let entry = self.collections.entry(def.collection).or_default();
        entry.models.retain(|m| m.def.sequence != def.sequence);
        entry.models.push(ModelData::new(def));
    }

    /// `None` clears every collection.
    pub fn clear_textures(&mut self, collection: Option<CollectionId>) {
        match collection {
            Some(c) => {
                if let Some(entry) = self.collections.get_mut(&c) {
                    entry.textures.clear();
                }
            }
            None => self.collections.values_mut().for_each(|e| e.textures.clear()),
        }
    }

    pub fn clear_models(&mut self, collection: Option<CollectionId>) {
        match collection {
            Some(c) => {
                if let Some(entry) = self.collections.get_mut(&c) {
                    entry.models.clear();
                }
            }
            None => self.collections.values_mut().for_each(|e| e.models.clear()),
        }
    }

    /// Reads the models and images of one collection. Nothing happens
    /// unless OpenGL is the active renderer.
    pub fn load_models_images(&mut self, collection: CollectionId, active: bool) -> LoadReport {
        let mut report = LoadReport::default();
        if !active {
            return report;
        }
        let Some(entry) = self.collections.get_mut(&collection) else {
            return report;
        };

        for data in &mut entry.models {
            if !data.is_present() {
                let path = self.base_dir.join(&data.def.model_file);
                match &self.loader {
                    Some(loader) => match loader.load(&data.def, &path) {
                        Ok(model) if model.is_present() => {
                            data.model = model;
                            report.models += 1;
                        }
                        Ok(_) => {
                            warn!("Model {} has no geometry", path.display());
                            report.failures += 1;
                        }
                        Err(e) => {
                            warn!("Failed to load model {}: {}", path.display(), e);
                            report.failures += 1;
                        }
                    },
                    None => {
                        warn!("No model loader registered; skipping {}", path.display());
                        report.failures += 1;
                    }
                }
            }
            report.images += data.skins.load_images(&self.base_dir);
        }

        for texture in &mut entry.textures {
            let options = texture.def.options;
            texture.normal = load_optional_image(&self.base_dir, texture.def.normal_image.as_deref(), &options);
            texture.glow = load_optional_image(&self.base_dir, texture.def.glow_image.as_deref(), &options);
            texture.uploaded = None;
            if texture.def.normal_image.is_some() && texture.normal.is_none() {
                report.failures += 1;
            }
            report.images += texture.normal.is_some() as usize + texture.glow.is_some() as usize;
        }

        info!(
            "Collection {}: loaded {} models and {} images ({} failures)",
            collection.index(),
            report.models,
            report.images,
            report.failures
        );
        report
    }

    pub fn unload_models_images(&mut self, collection: CollectionId) {
        let Some(entry) = self.collections.get_mut(&collection) else {
            return;
        };
        for data in &mut entry.models {
            data.model = Model::new();
            data.skins.unload_images();
            data.skins.reset(true);
        }
        for texture in &mut entry.textures {
            texture.normal = None;
            texture.glow = None;
            texture.uploaded = None;
        }
        debug!("Collection {}: unloaded models and images", collection.index());
    }

    /// The loaded model drawn for a shape sequence, with the model sequence
    /// to use (`None` for the whole model).
    pub fn get_model(&self, collection: CollectionId, sequence: u16) -> Option<(&ModelData, Option<u16>)> {
        self.collections
            .get(&collection)?
            .models
            .iter()
            .filter(|m| m.is_present())
            .find_map(|m| m.def.lookup(sequence).map(|seq| (m, seq)))
    }

    pub fn get_model_mut(&mut self, collection: CollectionId, sequence: u16) -> Option<&mut ModelData> {
        self.collections
            .get_mut(&collection)?
            .models
            .iter_mut()
            .find(|m| m.is_present() && m.def.lookup(sequence).is_some())
    }

    pub fn substitute_texture(&mut self, collection: CollectionId, clut: u8, bitmap: u16) -> Option<&mut SubstituteTexture> {
        self.collections
            .get_mut(&collection)?
            .textures
            .iter_mut()
            .find(|t| t.def.bitmap == bitmap && t.def.clut.matches(clut) && t.is_loaded())
    }

    pub fn reset_model_skins(&mut self, clear_gl: bool) {
        for entry in self.collections.values_mut() {
            for data in &mut entry.models {
                data.skins.reset(clear_gl);
            }
        }
    }

    /// Drops every uploaded texture so the renderer uploads them again.
    pub fn reset_textures(&mut self) {
        for entry in self.collections.values_mut() {
            for texture in &mut entry.textures {
                texture.uploaded = None;
            }
        }
        self.reset_model_skins(true);
        self.texture_generation += 1;
        info!("Textures reset (generation {})", self.texture_generation);
    }
}

static RESOURCES: Lazy<Mutex<OglResources>> = Lazy::new(|| Mutex::new(OglResources::new()));

pub fn resources() -> MutexGuard<'static, OglResources> {
    RESOURCES.lock()
}

pub fn load_models_images(collection: CollectionId) -> LoadReport {
    resources().load_models_images(collection, capabilities::is_active())
}

pub fn unload_models_images(collection: CollectionId) {
    resources().unload_models_images(collection);
}

pub fn reset_textures() {
    resources().reset_textures();
}

pub fn reset_model_skins(clear_gl: bool) {
    resources().reset_model_skins(clear_gl);
}
