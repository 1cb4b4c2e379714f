// Copyright 2025 the Battlemap Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! [`Persist`] impls for tokens, background images and whole maps.

use battlemap_format::{FormatError, Persist, TokenReader, TokenWriter};
use battlemap_shapes::LineCollection;
use battlemap_view::{CoordinateTransformer, Grid};
use kurbo::{Point, Rect};
use peniko::Color;

use crate::background::{BackgroundImage, BackgroundImages};
use crate::config::SessionConfig;
use crate::images::ImageKey;
use crate::map_data::MapData;
use crate::token::{BuiltInShape, Token, TokenArt, TokenCollection, TokenId};

impl Persist for ImageKey {
    fn serialize(&self, w: &mut TokenWriter) {
        w.write_str(self.as_str());
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        Ok(Self::new(r.read_string()?))
    }
}

/// `"color" rgba`, `"builtin" shape rgba` or `"image" key`.
impl Persist for TokenArt {
    fn serialize(&self, w: &mut TokenWriter) {
        match self {
            Self::SolidColor(color) => {
                w.write_str("color");
                color.serialize(w);
            }
            Self::BuiltIn { shape, color } => {
                w.write_str("builtin");
                w.write_str(shape.tag());
                color.serialize(w);
            }
            Self::Image(key) => {
                w.write_str("image");
                key.serialize(w);
            }
        }
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        let line = r.line();
        match r.read_string()?.as_str() {
            "color" => Ok(Self::SolidColor(Color::deserialize(r)?)),
            "builtin" => {
                let line = r.line();
                let shape = BuiltInShape::from_tag(&r.read_string()?).ok_or(
                    FormatError::InvalidValue {
                        line,
                        reason: "unknown built-in token shape",
                    },
                )?;
                Ok(Self::BuiltIn {
                    shape,
                    color: Color::deserialize(r)?,
                })
            }
            "image" => Ok(Self::Image(ImageKey::deserialize(r)?)),
            _ => Err(FormatError::InvalidValue {
                line,
                reason: "unknown token art",
            }),
        }
    }
}

/// `{ id name location size bloodied art... }`. Selection is not saved.
impl Persist for Token {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_u64(self.id().0);
        w.write_str(self.name());
        self.location().serialize(w);
        w.write_f64(self.size());
        w.write_bool(self.is_bloodied());
        self.art().serialize(w);
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let id = TokenId(r.read_u64()?);
        let name = r.read_string()?;
        let location = Point::deserialize(r)?;
        let size = r.read_finite_f64()?;
        let bloodied = r.read_bool()?;
        let art = TokenArt::deserialize(r)?;
        r.expect_object_end()?;
        let mut token = Self::new(name, location, size, art);
        token.set_id(id);
        token.set_bloodied(bloodied);
        Ok(token)
    }
}

/// `{ next_id [ token* ] }`.
impl Persist for TokenCollection {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        w.write_u64(self.next_id());
        w.begin_array();
        for token in self {
            token.serialize(w);
        }
        w.end_array();
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let next_id = r.read_u64()?;
        let tokens: Vec<Token> = Vec::deserialize(r)?;
        r.expect_object_end()?;
        let mut collection = Self::new();
        collection.restore(next_id, tokens);
        Ok(collection)
    }
}

/// `{ key x0 y0 x1 y1 }`.
impl Persist for BackgroundImage {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        self.key.serialize(w);
        for v in [self.rect.x0, self.rect.y0, self.rect.x1, self.rect.y1] {
            w.write_f64(v);
        }
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let key = ImageKey::deserialize(r)?;
        let rect = Rect::new(
            r.read_finite_f64()?,
            r.read_finite_f64()?,
            r.read_finite_f64()?,
            r.read_finite_f64()?,
        );
        r.expect_object_end()?;
        Ok(Self::new(key, rect))
    }
}

/// `[ image* ]`; degenerate images are dropped.
impl Persist for BackgroundImages {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_array();
        for image in self {
            image.serialize(w);
        }
        w.end_array();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        let mut images: Vec<BackgroundImage> = Vec::deserialize(r)?;
        let before = images.len();
        images.retain(|image| !image.is_degenerate());
        if images.len() < before {
            log::warn!("dropped {} degenerate background images", before - images.len());
        }
        let mut collection = Self::new();
        collection.restore(images);
        Ok(collection)
    }
}

/// `{ grid transformer background annotations gm_notes background_fog
/// gm_notes_fog tokens background_images }`.
///
/// A part that fails to load is logged and replaced by its empty default;
/// the rest of the map still loads.
impl Persist for MapData {
    fn serialize(&self, w: &mut TokenWriter) {
        w.begin_object();
        self.grid.serialize(w);
        self.transformer.serialize(w);
        self.background.serialize(w);
        self.annotations.serialize(w);
        self.gm_notes.serialize(w);
        self.background_fog.serialize(w);
        self.gm_notes_fog.serialize(w);
        self.tokens.serialize(w);
        self.background_images.serialize(w);
        w.end_object();
    }

    fn deserialize(r: &mut TokenReader<'_>) -> Result<Self, FormatError> {
        r.expect_object_begin()?;
        let mut map = Self::new(&SessionConfig::default());
        map.grid = r.read_or_recover(Grid::deserialize).unwrap_or_default();
        map.transformer = r
            .read_or_recover(CoordinateTransformer::deserialize)
            .unwrap_or(CoordinateTransformer::IDENTITY);
        for layer in [
            &mut map.background,
            &mut map.annotations,
            &mut map.gm_notes,
            &mut map.background_fog,
            &mut map.gm_notes_fog,
        ] {
            if let Some(loaded) = r.read_or_recover(LineCollection::deserialize) {
                *layer = loaded;
            }
        }
        if let Some(tokens) = r.read_or_recover(TokenCollection::deserialize) {
            map.tokens = tokens;
        }
        if let Some(images) = r.read_or_recover(BackgroundImages::deserialize) {
            map.background_images = images;
        }
        r.expect_object_end()?;
        Ok(map)
    }
}
