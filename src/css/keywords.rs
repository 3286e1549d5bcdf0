//! Precomputed hashes for the well-known CSS vocabulary
//!
//! Consumers that test against common tag names, property names or value
//! keywords can use these constants directly instead of interning first;
//! each constant is the FNV-1a hash [`crate::atom::AtomTable::hash_of`]
//! reports for the same keyword. Consistency between the two is a tested
//! property.

use crate::atom::fnv1a;

macro_rules! css_keywords {
  ($($name:ident = $text:literal;)*) => {
    $(pub const $name: u32 = fnv1a($text.as_bytes());)*

    /// Every keyword constant paired with its source text, for consistency
    /// checks.
    pub const ALL: &[(&str, u32)] = &[$(($text, $name),)*];
  };
}

css_keywords! {
  // Tag names.
  HTML = "html";
  HEAD = "head";
  BODY = "body";
  DIV = "div";
  SPAN = "span";
  P = "p";
  A = "a";
  UL = "ul";
  OL = "ol";
  LI = "li";
  TABLE = "table";
  TR = "tr";
  TD = "td";
  TH = "th";
  SECTION = "section";
  ARTICLE = "article";
  NAV = "nav";
  HEADER = "header";
  FOOTER = "footer";
  MAIN = "main";
  FORM = "form";
  INPUT = "input";
  BUTTON = "button";
  IMG = "img";
  H1 = "h1";
  H2 = "h2";
  H3 = "h3";
  H4 = "h4";
  H5 = "h5";
  H6 = "h6";

  // Attribute names.
  ID = "id";
  CLASS = "class";
  STYLE = "style";
  HREF = "href";
  SRC = "src";
  TYPE = "type";
  NAME = "name";
  VALUE = "value";

  // Property names.
  DISPLAY = "display";
  POSITION = "position";
  COLOR = "color";
  BACKGROUND = "background";
  BACKGROUND_COLOR = "background-color";
  WIDTH = "width";
  HEIGHT = "height";
  MARGIN = "margin";
  PADDING = "padding";
  BORDER = "border";
  TOP = "top";
  LEFT = "left";
  RIGHT = "right";
  BOTTOM = "bottom";
  FONT_SIZE = "font-size";
  FONT_WEIGHT = "font-weight";
  FONT_FAMILY = "font-family";
  LINE_HEIGHT = "line-height";
  TEXT_ALIGN = "text-align";
  OVERFLOW = "overflow";
  OPACITY = "opacity";
  Z_INDEX = "z-index";
  FLEX_DIRECTION = "flex-direction";
  JUSTIFY_CONTENT = "justify-content";
  ALIGN_ITEMS = "align-items";

  // Value keywords.
  NONE = "none";
  AUTO = "auto";
  BLOCK = "block";
  INLINE = "inline";
  INLINE_BLOCK = "inline-block";
  FLEX = "flex";
  GRID = "grid";
  ABSOLUTE = "absolute";
  RELATIVE = "relative";
  FIXED = "fixed";
  STATIC = "static";
  STICKY = "sticky";
  HIDDEN = "hidden";
  VISIBLE = "visible";
  CENTER = "center";
  BOLD = "bold";
  NORMAL = "normal";
  INHERIT = "inherit";
  INITIAL = "initial";
}
