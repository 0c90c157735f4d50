//! Reader for the `<opengl>` markup element of scenario and plugin files.

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;

use crate::config::rendering::RgbColor;
use crate::render::fog::{fog_table, FogData, FogTable, FogType};
use crate::render::resources::{
    resources, ClutSelector, CollectionId, LightType, ModelDef, OglResources, SequenceMapping, SkinDef,
    SubstituteTextureDef,
};
use crate::render::texture::{OpacityType, TextureOptions};
use crate::utils::error::{OglError, Result};

/// Partial update of one fog record; absent fields keep their value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogOverride {
    pub kind: FogType,
    pub is_present: Option<bool>,
    pub depth: Option<f32>,
    pub affects_landscapes: Option<bool>,
    pub color: Option<RgbColor>,
}

impl FogOverride {
    pub fn apply_to(&self, fog: &mut FogData) {
        if let Some(on) = self.is_present {
            fog.is_present = on;
        }
        if let Some(depth) = self.depth {
            fog.depth = depth;
        }
        if let Some(landscapes) = self.affects_landscapes {
            fog.affects_landscapes = landscapes;
        }
        if let Some(color) = self.color {
            fog.color = color;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenGlElement {
    pub found: bool,
    pub fogs: Vec<FogOverride>,
    pub textures: Vec<SubstituteTextureDef>,
    pub models: Vec<ModelDef>,
    /// `None` entries clear every collection
    pub texture_clears: Vec<Option<CollectionId>>,
    pub model_clears: Vec<Option<CollectionId>>,
}

impl OpenGlElement {
    pub fn apply(&self, fog_table: &FogTable, resources: &mut OglResources) {
        for clear in &self.texture_clears {
            resources.clear_textures(*clear);
        }
        for clear in &self.model_clears {
            resources.clear_models(*clear);
        }
        for def in &self.textures {
            resources.add_texture(def.clone());
        }
        for def in &self.models {
            resources.add_model(def.clone());
        }
        for fog in &self.fogs {
            fog.apply_to(&mut fog_table.get(fog.kind).write());
        }
        debug!(
            "Applied <opengl>: {} fogs, {} textures, {} models",
            self.fogs.len(),
            self.textures.len(),
            self.models.len()
        );
    }
}

/// Reads the attributes of one element through serde. Missing attributes
/// become `None`; unknown ones are ignored.
fn attributes<T: DeserializeOwned>(e: &BytesStart) -> Result<T> {
    let markup = format!("<{}/>", String::from_utf8_lossy(e));
    quick_xml::de::from_str(&markup)
        .map_err(|err| OglError::Xml(format!("<{}>: {}", element_name(e), err)))
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn bad(element: &str, attribute: &str, value: impl ToString) -> OglError {
    OglError::Attribute {
        element: element.to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn non_empty(path: Option<PathBuf>) -> Option<PathBuf> {
    path.filter(|p| !p.as_os_str().is_empty())
}

fn clut(raw: Option<i32>) -> Result<ClutSelector> {
    ClutSelector::from_raw(raw.unwrap_or(-1))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OpacityAttrs {
    opac_type: Option<i32>,
    opac_scale: Option<f32>,
    opac_shift: Option<f32>,
    void_visible: Option<bool>,
}

impl OpacityAttrs {
    fn options(&self, element: &str) -> Result<TextureOptions> {
        let mut options = TextureOptions::default();
        if let Some(raw) = self.opac_type {
            options.opacity_type = OpacityType::from_index(raw).ok_or_else(|| bad(element, "opac_type", raw))?;
        }
        if let Some(scale) = self.opac_scale {
            options.opacity_scale = scale;
        }
        if let Some(shift) = self.opac_shift {
            options.opacity_shift = shift;
        }
        if let Some(void_visible) = self.void_visible {
            options.void_visible = void_visible;
        }
        Ok(options)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FogAttrs {
    #[serde(rename = "type")]
    kind: Option<usize>,
    on: Option<bool>,
    depth: Option<f32>,
    landscapes: Option<bool>,
}

impl FogAttrs {
    fn into_override(self) -> Result<FogOverride> {
        let raw = self.kind.unwrap_or(0);
        let kind = FogType::from_index(raw).ok_or_else(|| bad("fog", "type", raw))?;
        if let Some(depth) = self.depth.filter(|d| *d < 0.0) {
            return Err(bad("fog", "depth", depth));
        }
        Ok(FogOverride {
            kind,
            is_present: self.on,
            depth: self.depth,
            affects_landscapes: self.landscapes,
            color: None,
        })
    }
}

/// Unit-range channels; missing ones are zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ColorAttrs {
    red: f32,
    green: f32,
    blue: f32,
}

#[derive(Debug, Deserialize)]
struct TextureAttrs {
    coll: i32,
    clut: Option<i32>,
    bitmap: u16,
    normal_image: Option<PathBuf>,
    glow_image: Option<PathBuf>,
}

impl TextureAttrs {
    fn into_def(self, opacity: &OpacityAttrs) -> Result<SubstituteTextureDef> {
        Ok(SubstituteTextureDef {
            collection: CollectionId::new(self.coll)?,
            clut: clut(self.clut)?,
            bitmap: self.bitmap,
            normal_image: non_empty(self.normal_image),
            glow_image: non_empty(self.glow_image),
            options: opacity.options("texture")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ModelAttrs {
    coll: i32,
    seq: Option<u16>,
    file: Option<PathBuf>,
    #[serde(rename = "type")]
    model_type: Option<String>,
    scale: Option<f32>,
    x_rot: Option<f32>,
    y_rot: Option<f32>,
    z_rot: Option<f32>,
    x_shift: Option<f32>,
    y_shift: Option<f32>,
    z_shift: Option<f32>,
    side: Option<i8>,
    norm_type: Option<i16>,
    norm_split: Option<f32>,
    light_type: Option<i32>,
    depth_type: Option<i8>,
}

impl ModelAttrs {
    fn into_def(self) -> Result<ModelDef> {
        let file = non_empty(self.file).ok_or_else(|| bad("model", "file", ""))?;
        let mut def = ModelDef::new(CollectionId::new(self.coll)?, self.seq.unwrap_or(0), file);
        def.model_type = self.model_type;
        def.scale = self.scale.unwrap_or(def.scale);
        for (slot, value) in def.rotation.iter_mut().zip([self.x_rot, self.y_rot, self.z_rot]) {
            *slot = value.unwrap_or(*slot);
        }
        for (slot, value) in def.shift.iter_mut().zip([self.x_shift, self.y_shift, self.z_shift]) {
            *slot = value.unwrap_or(*slot);
        }
        if let Some(side) = self.side {
            def.sidedness = side.signum();
        }
        def.normal_type = self.norm_type.unwrap_or(def.normal_type);
        def.normal_split = self.norm_split.unwrap_or(def.normal_split);
        if let Some(raw) = self.light_type {
            def.light_type = LightType::from_index(raw).ok_or_else(|| bad("model", "light_type", raw))?;
        }
        if let Some(depth) = self.depth_type {
            def.depth_type = depth.signum();
        }
        Ok(def)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SkinAttrs {
    clut: Option<i32>,
    normal_image: Option<PathBuf>,
    glow_image: Option<PathBuf>,
}

impl SkinAttrs {
    fn into_def(self, opacity: &OpacityAttrs) -> Result<SkinDef> {
        Ok(SkinDef {
            clut: clut(self.clut)?,
            normal_image: non_empty(self.normal_image),
            glow_image: non_empty(self.glow_image),
            options: opacity.options("skin")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SeqMapAttrs {
    seq: u16,
    model_seq: Option<i32>,
}

impl SeqMapAttrs {
    fn into_mapping(self) -> Result<SequenceMapping> {
        let model_sequence = match self.model_seq.unwrap_or(-1) {
            -1 => None,
            n => Some(u16::try_from(n).map_err(|_| bad("seq_map", "model_seq", n))?),
        };
        Ok(SequenceMapping {
            sequence: self.seq,
            model_sequence,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ClearAttrs {
    coll: Option<i32>,
}

impl ClearAttrs {
    fn collection(self) -> Result<Option<CollectionId>> {
        self.coll.map(CollectionId::new).transpose()
    }
}

enum Frame {
    OpenGl,
    Fog(usize),
    Model(usize),
    Other,
}

/// Parses every `<opengl>` element in a document, in order.
pub fn parse_opengl(xml: &str) -> Result<OpenGlElement> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut out = OpenGlElement::default();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let (e, is_empty) = match reader.read_event()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => {
                stack.pop();
                continue;
            }
            Event::Eof => break,
            _ => continue,
        };

        let name = e.name();
        let name = name.as_ref();
        let frame = match (stack.last(), name) {
            (_, b"opengl") => {
                out.found = true;
                Frame::OpenGl
            }
            (Some(Frame::OpenGl), b"fog") => {
                out.fogs.push(attributes::<FogAttrs>(&e)?.into_override()?);
                Frame::Fog(out.fogs.len() - 1)
            }
            (Some(Frame::Fog(i)), b"color") => {
                let color: ColorAttrs = attributes(&e)?;
                out.fogs[*i].color = Some(RgbColor::from_unit(color.red, color.green, color.blue));
                Frame::Other
            }
            (Some(Frame::OpenGl), b"texture") => {
                let opacity: OpacityAttrs = attributes(&e)?;
                out.textures.push(attributes::<TextureAttrs>(&e)?.into_def(&opacity)?);
                Frame::Other
            }
            (Some(Frame::OpenGl), b"model") => {
                out.models.push(attributes::<ModelAttrs>(&e)?.into_def()?);
                Frame::Model(out.models.len() - 1)
            }
            (Some(Frame::Model(i)), b"skin") => {
                let opacity: OpacityAttrs = attributes(&e)?;
                let skin = attributes::<SkinAttrs>(&e)?.into_def(&opacity)?;
                out.models[*i].skins.push(skin);
                Frame::Other
            }
            (Some(Frame::Model(i)), b"seq_map") => {
                let mapping = attributes::<SeqMapAttrs>(&e)?.into_mapping()?;
                out.models[*i].sequence_map.push(mapping);
                Frame::Other
            }
            (Some(Frame::OpenGl), b"txtr_clear") => {
                out.texture_clears.push(attributes::<ClearAttrs>(&e)?.collection()?);
                Frame::Other
            }
            (Some(Frame::OpenGl), b"model_clear") => {
                out.model_clears.push(attributes::<ClearAttrs>(&e)?.collection()?);
                Frame::Other
            }
            (Some(Frame::OpenGl), other) => {
                return Err(OglError::UnknownElement(String::from_utf8_lossy(other).into_owned()));
            }
            _ => Frame::Other,
        };

        if !is_empty {
            stack.push(frame);
        }
    }

    Ok(out)
}

/// Parses a document and applies its `<opengl>` element to the
/// process-wide fog table and resource registry.
pub fn load_opengl(xml: &str) -> Result<OpenGlElement> {
    let element = parse_opengl(xml)?;
    if element.found {
        element.apply(fog_table(), &mut resources());
    }
    Ok(element)
}
