//! Typed builders for images and image collections.
//!
//! Each method appends one algorithm invocation to the graph; nothing is
//! evaluated locally.

use chrono::NaiveDate;

use super::geometry::Geometry;
use super::value::Value;
use crate::period::DATE_FORMAT;

const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

/// A server-side image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image(Value);

impl Image {
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn load(id: &str) -> Self {
        Self(Value::invoke("Image.load", [("id", Value::from(id))]))
    }

    /// Constant image with one band.
    pub fn constant(value: f64) -> Self {
        Self(Value::invoke("Image.constant", [("value", Value::from(value))]))
    }

    fn unary(&self, function: &str, key: &str) -> Self {
        Self(Value::invoke(function, [(key, self.0.clone())]))
    }

    fn binary(&self, function: &str, other: &Image) -> Self {
        Self(Value::invoke(
            function,
            [("image1", self.0.clone()), ("image2", other.0.clone())],
        ))
    }

    pub fn select(&self, bands: &[&str]) -> Self {
        Self(Value::invoke(
            "Image.select",
            [("input", self.0.clone()), ("bandSelectors", Value::strings(bands))],
        ))
    }

    pub fn rename(&self, names: &[&str]) -> Self {
        Self(Value::invoke(
            "Image.rename",
            [("input", self.0.clone()), ("names", Value::strings(names))],
        ))
    }

    /// `(first - second) / (first + second)` as a single band named `nd`.
    pub fn normalized_difference(&self, first: &str, second: &str) -> Self {
        Self(Value::invoke(
            "Image.normalizedDifference",
            [
                ("input", self.0.clone()),
                ("bandNames", Value::strings(&[first, second])),
            ],
        ))
    }

    pub fn add_bands(&self, other: &Image) -> Self {
        Self(Value::invoke(
            "Image.addBands",
            [("dstImg", self.0.clone()), ("srcImg", other.0.clone())],
        ))
    }

    /// Resampling mode: `bilinear` or `bicubic`.
    pub fn resample(&self, mode: &str) -> Self {
        Self(Value::invoke(
            "Image.resample",
            [("image", self.0.clone()), ("mode", Value::from(mode))],
        ))
    }

    pub fn projection(&self) -> Value {
        Value::invoke("Image.projection", [("image", self.0.clone())])
    }

    /// Reproject to `crs` (a projection node) at `scale` meters.
    pub fn reproject(&self, crs: Value, scale: f64) -> Self {
        Self(Value::invoke(
            "Image.reproject",
            [
                ("image", self.0.clone()),
                ("crs", crs),
                ("scale", Value::from(scale)),
            ],
        ))
    }

    pub fn update_mask(&self, mask: &Image) -> Self {
        Self(Value::invoke(
            "Image.updateMask",
            [("image", self.0.clone()), ("mask", mask.0.clone())],
        ))
    }

    pub fn gte(&self, value: f64) -> Self {
        self.binary("Image.gte", &Image::constant(value))
    }

    pub fn equals(&self, value: f64) -> Self {
        self.binary("Image.eq", &Image::constant(value))
    }

    pub fn and(&self, other: &Image) -> Self {
        self.binary("Image.and", other)
    }

    pub fn plus(&self, other: &Image) -> Self {
        self.binary("Image.add", other)
    }

    pub fn multiply(&self, value: f64) -> Self {
        self.binary("Image.multiply", &Image::constant(value))
    }

    pub fn divide(&self, value: f64) -> Self {
        self.binary("Image.divide", &Image::constant(value))
    }

    pub fn pow(&self, value: f64) -> Self {
        self.binary("Image.pow", &Image::constant(value))
    }

    pub fn bitwise_and(&self, mask: i64) -> Self {
        self.binary(
            "Image.bitwiseAnd",
            &Image(Value::invoke("Image.constant", [("value", Value::from(mask))])),
        )
    }

    pub fn sqrt(&self) -> Self {
        self.unary("Image.sqrt", "value")
    }

    pub fn to_float(&self) -> Self {
        self.unary("Image.toFloat", "value")
    }

    /// Replace masked pixels with `value`.
    pub fn unmask(&self, value: f64) -> Self {
        Self(Value::invoke(
            "Image.unmask",
            [("input", self.0.clone()), ("value", Value::from(value))],
        ))
    }

    pub fn clip(&self, geometry: &Geometry) -> Self {
        Self(Value::invoke(
            "Image.clip",
            [("input", self.0.clone()), ("geometry", geometry.value().clone())],
        ))
    }

    /// Clip to `geometry` and fix the output scale, as done before export.
    pub fn clip_to_bounds_and_scale(&self, geometry: &Geometry, scale: f64) -> Self {
        Self(Value::invoke(
            "Image.clipToBoundsAndScale",
            [
                ("input", self.0.clone()),
                ("geometry", geometry.value().clone()),
                ("scale", Value::from(scale)),
            ],
        ))
    }

    /// Copy `properties` from `source` onto this image.
    pub fn copy_properties(&self, source: &Image, properties: &[&str]) -> Self {
        Self(Value::invoke(
            "Element.copyProperties",
            [
                ("destination", self.0.clone()),
                ("source", source.0.clone()),
                ("properties", Value::strings(properties)),
            ],
        ))
    }
}

/// A server-side image collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageCollection(Value);

impl ImageCollection {
    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn load(id: &str) -> Self {
        Self(Value::invoke("ImageCollection.load", [("id", Value::from(id))]))
    }

    fn filter(&self, filter: Value) -> Self {
        Self(Value::invoke(
            "Collection.filter",
            [("collection", self.0.clone()), ("filter", filter)],
        ))
    }

    /// Keep images intersecting `geometry`.
    pub fn filter_bounds(&self, geometry: &Geometry) -> Self {
        self.filter(Value::invoke(
            "Filter.intersects",
            [
                ("leftField", Value::from(".all")),
                ("rightValue", geometry.value().clone()),
            ],
        ))
    }

    /// Keep images acquired in `[start, end)`.
    pub fn filter_date(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let date = |d: NaiveDate| {
            Value::invoke(
                "Date",
                [("value", Value::from(d.format(DATE_FORMAT).to_string()))],
            )
        };
        self.filter(Value::invoke(
            "Filter.dateRangeContains",
            [
                (
                    "leftValue",
                    Value::invoke("DateRange", [("start", date(start)), ("end", date(end))]),
                ),
                ("rightField", Value::from("system:time_start")),
            ],
        ))
    }

    /// Attach `bands` of the matching image of `other` to each image.
    pub fn link_collection(&self, other: &ImageCollection, bands: &[&str]) -> Self {
        Self(Value::invoke(
            "ImageCollection.linkCollection",
            [
                ("imageCollection", self.0.clone()),
                ("otherCollection", other.0.clone()),
                ("linkedBands", Value::strings(bands)),
            ],
        ))
    }

    /// Apply `f` to every image.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnOnce(Image) -> Image,
    {
        let arg = Image(Value::Argument(MAPPING_VAR.to_string()));
        let body = f(arg).into_value();
        Self(Value::invoke(
            "Collection.map",
            [
                ("collection", self.0.clone()),
                (
                    "baseAlgorithm",
                    Value::Function {
                        parameters: vec![MAPPING_VAR.to_string()],
                        body: Box::new(body),
                    },
                ),
            ],
        ))
    }

    pub fn select(&self, bands: &[&str]) -> Self {
        self.map(|image| image.select(bands))
    }

    fn reduce(&self, function: &str) -> Image {
        Image(Value::invoke(function, [("collection", self.0.clone())]))
    }

    /// Per-pixel median; band names are kept.
    pub fn median(&self) -> Image {
        self.reduce("reduce.median")
    }

    pub fn mean(&self) -> Image {
        self.reduce("reduce.mean")
    }

    /// Number of unmasked observations per pixel.
    pub fn count(&self) -> Image {
        self.reduce("reduce.count")
    }

    /// Number of images, as a value to evaluate remotely.
    pub fn size(&self) -> Value {
        Value::invoke("Collection.size", [("collection", self.0.clone())])
    }
}
