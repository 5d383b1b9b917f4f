//! Shared fixtures for pack / checker / intel tests: an in-memory
//! repository with a small but complete class model.

use std::path::PathBuf;

use crate::analyzer::Analyzer;
use crate::config::Workspace;
use crate::document::DocumentStore;
use crate::host::{ManualClock, MemoryFileSystem};
use crate::model::ClassModelManager;
use crate::pack::{PackRegistry, QueryCtx};

/// Class model covering the constructs the tests exercise.
pub const TEST_MODEL: &str = r##"<Model>
  <Model.Class name="Skin">
    <Attributes x:id="attributes" Class:ChildGroup="skinroot"/>
  </Model.Class>
  <Model.Class name="Include">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="url" type="uri"/>
    </List>
  </Model.Class>
  <Model.Class name="Import">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot"/>
    <List x:id="members">
      <Model.Member name="url" type="uri"/>
    </List>
  </Model.Class>
  <Model.Class name="Externals">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="externals"/>
  </Model.Class>
  <Model.Class name="External">
    <Attributes x:id="attributes" Class:SchemaGroups="externals"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Styles">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="styles"/>
  </Model.Class>
  <Model.Class name="Style">
    <Attributes x:id="attributes" Class:SchemaGroups="styles"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="color" type="string"/>
      <Model.Member name="textsize" type="string"/>
      <Model.Member name="appstyle" type="bool"/>
      <Model.Member name="override" type="bool"/>
      <Model.Member name="width" type="float"/>
      <Model.Member name="height" type="float"/>
    </List>
    <Model.Documentation>
      <String x:id="brief">A visual style.</String>
    </Model.Documentation>
  </Model.Class>
  <Model.Class name="StyleAlias" parent="Style">
    <List x:id="members">
      <Model.Member name="styles" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Resources">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="resources"/>
  </Model.Class>
  <Model.Class name="Color">
    <Attributes x:id="attributes" Class:SchemaGroups="resources theme"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="value" type="color"/>
    </List>
  </Model.Class>
  <Model.Class name="Image">
    <Attributes x:id="attributes" Class:SchemaGroups="resources" Class:ChildGroup="resources"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="url" type="uri"/>
      <Model.Member name="frames" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="ImagePart" parent="Image"/>
  <Model.Class name="ShapeImage" parent="Image"/>
  <Model.Class name="IconSet" parent="Image"/>
  <Model.Class name="Shapes">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="shapes"/>
  </Model.Class>
  <Model.Class name="Shape">
    <Attributes x:id="attributes" Class:SchemaGroups="shapes" Class:ChildGroup="shapes"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="ThemeElements">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="theme"/>
  </Model.Class>
  <Model.Class name="Font">
    <Attributes x:id="attributes" Class:SchemaGroups="theme"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="size" type="string"/>
      <Model.Member name="themeid" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Metric">
    <Attributes x:id="attributes" Class:SchemaGroups="theme"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="value" type="float"/>
    </List>
  </Model.Class>
  <Model.Class name="ColorScheme">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot" Class:ChildGroup="colorscheme"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="ColorScheme.Color">
    <Attributes x:id="attributes" Class:SchemaGroups="colorscheme"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="value" type="color"/>
    </List>
  </Model.Class>
  <Model.Class name="Form">
    <Attributes x:id="attributes" Class:SchemaGroups="skinroot views" Class:ChildGroup="views"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="attach" type="string"/>
      <Model.Member name="command.name" type="string"/>
      <Model.Member name="command.category" type="string"/>
    </List>
    <Model.Documentation>
      <String x:id="brief">A reusable form.</String>
      <String x:id="code">&lt;Form name="Example"/&gt;</String>
    </Model.Documentation>
  </Model.Class>
  <Model.Class name="View">
    <Attributes x:id="attributes" Class:SchemaGroups="views" Class:ChildGroup="views"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="style" type="string"/>
      <Model.Member name="width" type="float"/>
      <Model.Member name="height" type="float"/>
      <Model.Member name="image" type="string"/>
      <Model.Member name="url" type="uri"/>
      <Model.Member name="visible" type="bool"/>
      <Model.Member name="align" type="enum"/>
      <Model.Member name="sizelimits" type="string"/>
      <Model.Member name="margin" type="size"/>
      <Model.Member name="bounds" type="rect"/>
      <Model.Member name="rotation" type="point3d"/>
    </List>
    <Model.Documentation>
      <String x:id="brief">A rectangular view.</String>
      <String x:id="detailed">Views instantiate forms by name.</String>
    </Model.Documentation>
  </Model.Class>
  <Model.Class name="ScrollView" parent="View"/>
  <Model.Class name="Target" parent="View"/>
  <Model.Class name="Button" parent="View">
    <List x:id="members">
      <Model.Member name="command.name" type="string"/>
      <Model.Member name="command.category" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Slider" parent="View"/>
  <Model.Class name="Layout" parent="View">
    <List x:id="members">
      <Model.Member name="layout.class" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Delegate" parent="View">
    <List x:id="members">
      <Model.Member name="form.name" type="string"/>
      <Model.Member name="size" type="size"/>
    </List>
  </Model.Class>
  <Model.Class name="PopupBox" parent="View">
    <List x:id="members">
      <Model.Member name="form.name" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Animation" parent="View">
    <List x:id="members">
      <Model.Member name="repeat" type="int"/>
      <Model.Member name="duration" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="statement" abstract="true">
    <Attributes x:id="attributes" Class:SchemaGroups="views skinroot styles resources" Class:ChildGroup="views"/>
    <List x:id="members">
      <Model.Member name="name" type="string"/>
      <Model.Member name="variable" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="define" parent="statement"/>
  <Model.Class name="if" parent="statement">
    <List x:id="members">
      <Model.Member name="value" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="switch" parent="statement">
    <Attributes x:id="attributes" Class:SchemaGroups="views skinroot styles resources" Class:ChildGroup="cases"/>
  </Model.Class>
  <Model.Class name="case" parent="statement">
    <Attributes x:id="attributes" Class:SchemaGroups="cases"/>
    <List x:id="members">
      <Model.Member name="value" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="default" parent="statement">
    <Attributes x:id="attributes" Class:SchemaGroups="cases"/>
  </Model.Class>
  <Model.Class name="foreach" parent="statement">
    <List x:id="members">
      <Model.Member name="in" type="string"/>
      <Model.Member name="start" type="int"/>
      <Model.Member name="count" type="int"/>
    </List>
  </Model.Class>
  <Model.Class name="styleselector" parent="statement">
    <List x:id="members">
      <Model.Member name="styles" type="string"/>
    </List>
  </Model.Class>
  <Model.Class name="Options">
    <Attributes x:id="attributes" Class:SchemaGroups="views"/>
    <List x:id="members">
      <Model.Member name="options" type="enum"/>
      <Model.Member name="type" type="string"/>
    </List>
  </Model.Class>
  <Model.Enumeration name="View.align">
    <Model.Enumerator name="left"/>
    <Model.Enumerator name="center">
      <Model.Documentation>
        <String x:id="brief">Centered within the parent.</String>
      </Model.Documentation>
    </Model.Enumerator>
    <Model.Enumerator name="right"/>
  </Model.Enumeration>
  <Model.Enumeration name="Form.anchor">
    <Model.Enumerator name="top"/>
    <Model.Enumerator name="bottom"/>
  </Model.Enumeration>
  <Model.Enumeration name="Layout.layout.class">
    <Model.Enumerator name="box"/>
    <Model.Enumerator name="clipper"/>
    <Model.Enumerator name="sizevariant"/>
    <Model.Enumerator name="table"/>
  </Model.Enumeration>
  <DefaultColors>
    <Color name="red" value="#FF0000"/>
    <Color name="transparent" value="#00000000"/>
  </DefaultColors>
  <ThemeMetrics>
    <Metric name="padding" value="8"/>
    <Metric name="padding.small" value="4"/>
  </ThemeMetrics>
  <Languages>
    <Language id="en"/>
    <Language id="de"/>
  </Languages>
</Model>
"##;

pub const ELEMENTS_MODEL_PATH: &str = "/repo/classmodels/Skin Elements.classModel";
pub const STYLES_MODEL_PATH: &str = "/repo/classmodels/Visual Styles.classModel";

/// A small visual-styles model so both slots are populated.
pub const TEST_STYLES_MODEL: &str = r#"<Model>
  <Model.Class name="VisualStyle">
    <Model.Documentation>
      <String x:id="brief">Base visual style.</String>
    </Model.Documentation>
  </Model.Class>
</Model>
"#;

/// Everything a registry-level test needs, with split borrows.
pub struct Fixture {
    pub fs: MemoryFileSystem,
    pub clock: ManualClock,
    pub models: ClassModelManager,
    pub docs: DocumentStore,
    pub reg: PackRegistry,
    pub platform: Option<&'static str>,
}

impl Fixture {
    /// Build a fixture over `/repo` with the standard class model plus the
    /// given `(path, contents)` files.
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let mut fs = MemoryFileSystem::new();
        fs.insert("/repo/repo.json", "{}");
        fs.insert(ELEMENTS_MODEL_PATH, TEST_MODEL);
        fs.insert(STYLES_MODEL_PATH, TEST_STYLES_MODEL);
        for (path, contents) in files {
            fs.insert(*path, *contents);
        }

        let mut models = ClassModelManager::new();
        models
            .load_class_model(std::path::Path::new(ELEMENTS_MODEL_PATH), &fs)
            .expect("test model loads");
        models
            .load_style_model(std::path::Path::new(STYLES_MODEL_PATH), &fs)
            .expect("test styles model loads");

        let mut reg = PackRegistry::new();
        reg.set_skins_locations(vec![PathBuf::from("/repo/skins")]);

        Self {
            fs,
            clock: ManualClock::new(),
            models,
            docs: DocumentStore::new(),
            reg,
            platform: None,
        }
    }

    /// Borrow the query context and the registry at once.
    pub fn split(&mut self) -> (QueryCtx<'_>, &mut PackRegistry) {
        (
            QueryCtx {
                fs: &self.fs,
                clock: &self.clock,
                models: &self.models,
                docs: &self.docs,
                platform: self.platform,
            },
            &mut self.reg,
        )
    }
}

/// An [`Analyzer`] over the same in-memory repository, for checker and
/// intel tests that want the full surface.
pub fn analyzer_with(files: &[(&str, &str)]) -> Analyzer {
    let mut fs = MemoryFileSystem::new();
    fs.insert("/repo/repo.json", "{}");
    fs.insert(ELEMENTS_MODEL_PATH, TEST_MODEL);
    fs.insert(STYLES_MODEL_PATH, TEST_STYLES_MODEL);
    for (path, contents) in files {
        fs.insert(*path, *contents);
    }
    let workspace = Workspace::open(PathBuf::from("/repo"), &fs).expect("workspace opens");
    let mut analyzer = Analyzer::new(fs, ManualClock::new());
    analyzer.configure(&workspace);
    analyzer
}
