pub mod format;

use crate::domain::report::ReportPayload;
use crate::report::config::{Layout, ReportConfig};
use anyhow::Context as _;
use handlebars::{
    handlebars_helper, Context, Handlebars, Helper, HelperDef, HelperResult, Output,
    RenderContext, RenderErrorReason,
};
use serde_json::Value;
use std::collections::BTreeMap;

const MARKET_TEMPLATE: &str = include_str!("../../templates/market.hbs");
const CRYPTO_TEMPLATE: &str = include_str!("../../templates/crypto.hbs");
const STOCK_TEMPLATE: &str = include_str!("../../templates/stock.hbs");

/// Name-map helpers every bundled template may call. Reports that do not
/// configure one get an identity map.
const STANDARD_NAME_MAPS: [&str; 6] = [
    "indexNameMap",
    "commodityNameMap",
    "exchangeRateMap",
    "cryptoNameMap",
    "treasuryNameMap",
    "stockNameMap",
];

handlebars_helper!(format_number_helper: |v: Json| {
    as_f64(v).map(format::format_number).unwrap_or_default()
});
handlebars_helper!(format_change_helper: |v: Json| {
    as_f64(v).map(format::format_change).unwrap_or_default()
});
handlebars_helper!(format_change_percent_helper: |v: Json| {
    as_f64(v).map(format::format_change_percent).unwrap_or_default()
});
handlebars_helper!(change_class_helper: |v: Json| format::change_class(as_f64(v)));
handlebars_helper!(class_style_helper: |class: str| format::class_style(class));
handlebars_helper!(format_importance_helper: |v: Json| format::importance_stars(as_f64(v)));
handlebars_helper!(format_large_number_helper: |v: Json| {
    as_f64(v).map(format::format_large_number).unwrap_or_else(|| "0".to_string())
});
handlebars_helper!(value_class_helper: |v: Json, prev: Json| {
    format::value_class(&as_text(v), &as_text(prev))
});

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `{{indexNameMap name}}`: display name for a symbol, or the symbol itself.
struct NameMapHelper {
    names: BTreeMap<String, String>,
}

impl HelperDef for NameMapHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper,
        _: &Handlebars,
        _: &Context,
        _: &mut RenderContext,
        out: &mut dyn Output,
    ) -> HelperResult {
        let raw = h
            .param(0)
            .map(|p| as_text(p.value()))
            .ok_or(RenderErrorReason::ParamNotFoundForIndex("name map", 0))?;
        let shown = self.names.get(&raw).map(String::as_str).unwrap_or(&raw);
        out.write(&handlebars::html_escape(shown))?;
        Ok(())
    }
}

/// Handlebars registry for one report: the bundled template for its layout
/// plus the formatting and name-map helpers.
pub struct ReportRenderer {
    registry: Handlebars<'static>,
    template: &'static str,
}

impl ReportRenderer {
    pub fn new(config: &ReportConfig) -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();

        registry.register_helper("formatNumber", Box::new(format_number_helper));
        registry.register_helper("formatChange", Box::new(format_change_helper));
        registry.register_helper("formatChangePercent", Box::new(format_change_percent_helper));
        registry.register_helper("getChangeClass", Box::new(change_class_helper));
        registry.register_helper("formatImportance", Box::new(format_importance_helper));
        registry.register_helper("formatLargeNumber", Box::new(format_large_number_helper));
        registry.register_helper("getValueClass", Box::new(value_class_helper));
        registry.register_helper("classStyle", Box::new(class_style_helper));

        for name in STANDARD_NAME_MAPS {
            if !config.name_maps.contains_key(name) {
                registry.register_helper(
                    name,
                    Box::new(NameMapHelper {
                        names: BTreeMap::new(),
                    }),
                );
            }
        }
        for (name, names) in &config.name_maps {
            registry.register_helper(
                name,
                Box::new(NameMapHelper {
                    names: names.clone(),
                }),
            );
        }

        let (template, source) = match config.layout {
            Layout::Market => ("market", MARKET_TEMPLATE),
            Layout::Crypto => ("crypto", CRYPTO_TEMPLATE),
            Layout::Stock => ("stock", STOCK_TEMPLATE),
        };
        registry
            .register_template_string(template, source)
            .with_context(|| format!("bundled template {template} failed to compile"))?;

        Ok(Self { registry, template })
    }

    pub fn render(&self, payload: &ReportPayload) -> anyhow::Result<String> {
        self.registry
            .render(self.template, payload)
            .with_context(|| format!("render {} report failed", payload.report))
    }
}
