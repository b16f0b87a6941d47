//! Generation of the stylesheet module
//!
//! The module is produced from a fixed skeleton: it is parsed once per call,
//! the stylesheet is written into the template literal node, optional
//! sections (labelled statements) are kept or dropped, and the AST is printed.
//! Nothing is spliced into JavaScript source text directly.

use swc_core::common::{sync::Lrc, FileName, Globals, SourceMap, GLOBALS};
use swc_core::ecma::ast::*;
use swc_core::ecma::codegen::{text_writer::JsWriter, Config as CodegenConfig, Emitter};
use swc_core::ecma::parser::{parse_file_as_module, Syntax};
use swc_core::ecma::visit::{VisitMut, VisitMutWith};

use crate::errors::{PluginError, Result};

const STYLESHEET_PLACEHOLDER: &str = "__TWC_STYLESHEET__";
const HOT_UPDATE_SECTION: &str = "twc_hot_update";
const INJECT_CSS_SECTION: &str = "twc_inject_css";

/// Global hook replacing the shared sheet's content
pub const REPLACE_HOOK: &str = "_TAILWIND_WEB_COMPONENTS_REPLACE";

/// Global latch set once the sheet was adopted by the document
pub const INJECTED_FLAG: &str = "_TAILWIND_WEB_COMPONENTS_INJECTED";

const MODULE_SKELETON: &str = r#"
import { VueElement, defineComponent } from "vue";
const sheet = new CSSStyleSheet();
sheet.replaceSync(`__TWC_STYLESHEET__`);
globalThis._TAILWIND_WEB_COMPONENTS_REPLACE = function(content) {
  sheet.replaceSync(content);
};
twc_hot_update: if (import.meta.hot) {
  import.meta.hot.on("twc:reload", (data) => {
    globalThis._TAILWIND_WEB_COMPONENTS_REPLACE(data.content);
  });
}
twc_inject_css: if (globalThis?.document?.head && globalThis._TAILWIND_WEB_COMPONENTS_INJECTED !== true) {
  globalThis.document.adoptedStyleSheets.push(sheet);
  globalThis._TAILWIND_WEB_COMPONENTS_INJECTED = true;
}
function defineCustomElement(options, hydrate) {
  const Comp = defineComponent(options);
  class VueCustomElement extends VueElement {
    constructor(initialProps) {
      super(Comp, initialProps, hydrate);
      const shadow = this.shadowRoot;
      shadow.adoptedStyleSheets = [sheet];
    }
  }
  VueCustomElement.def = Comp;
  return VueCustomElement;
}
export { defineCustomElement };
"#;

/// Which optional sections the module carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleOptions {
    /// Adopt the sheet into `document` once per page
    pub inject_css: bool,
    /// Listen for live stylesheet updates (development only)
    pub hot_update: bool,
}

/// Escape text for the body of a JavaScript template literal
pub fn escape_template_literal(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace("${", "\\${")
}

struct ModuleFiller<'a> {
    css: &'a str,
    options: ModuleOptions,
    filled: bool,
}

impl ModuleFiller<'_> {
    fn section_enabled(&self, label: &str) -> Option<bool> {
        match label {
            HOT_UPDATE_SECTION => Some(self.options.hot_update),
            INJECT_CSS_SECTION => Some(self.options.inject_css),
            _ => None,
        }
    }
}

impl VisitMut for ModuleFiller<'_> {
    fn visit_mut_module_items(&mut self, items: &mut Vec<ModuleItem>) {
        for item in std::mem::take(items) {
            match item {
                ModuleItem::Stmt(Stmt::Labeled(labeled)) => {
                    match self.section_enabled(&labeled.label.sym) {
                        Some(true) => items.push(ModuleItem::Stmt(*labeled.body)),
                        Some(false) => {}
                        None => items.push(ModuleItem::Stmt(Stmt::Labeled(labeled))),
                    }
                }
                other => items.push(other),
            }
        }

        items.visit_mut_children_with(self);
    }

    fn visit_mut_tpl(&mut self, node: &mut Tpl) {
        if let [quasi] = node.quasis.as_mut_slice() {
            if &*quasi.raw == STYLESHEET_PLACEHOLDER {
                quasi.raw = escape_template_literal(self.css).into();
                quasi.cooked = Some(self.css.into());
                self.filled = true;
                return;
            }
        }

        node.visit_mut_children_with(self);
    }
}

/// Generate the module source embedding `css`
pub fn generate_module(css: &str, options: ModuleOptions) -> Result<String> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Custom("tailwind-web-components".to_string()).into(),
        MODULE_SKELETON.to_string(),
    );

    GLOBALS.set(&Globals::new(), || {
        let mut module = parse_file_as_module(
            &fm,
            Syntax::Es(Default::default()),
            EsVersion::latest(),
            None,
            &mut vec![],
        )
        .map_err(|e| PluginError::CodegenError(format!("Invalid module skeleton: {:?}", e)))?;

        let mut filler = ModuleFiller {
            css,
            options,
            filled: false,
        };
        module.visit_mut_with(&mut filler);

        if !filler.filled {
            return Err(PluginError::CodegenError(
                "Module skeleton has no stylesheet placeholder".to_string(),
            ));
        }

        let mut buf = vec![];
        {
            let mut emitter = Emitter {
                cfg: CodegenConfig::default(),
                cm: cm.clone(),
                comments: None,
                wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
            };
            emitter
                .emit_module(&module)
                .map_err(|e| PluginError::CodegenError(format!("Failed to emit module: {}", e)))?;
        }

        String::from_utf8(buf)
            .map_err(|e| PluginError::CodegenError(format!("Generated module is not UTF-8: {}", e)))
    })
}
