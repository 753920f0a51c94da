//! Project descriptor rendering.
//!
//! The descriptor tells the engine what the module consists of. Every
//! multi-valued field is de-duplicated and written in descending
//! lexicographic order, so the document depends only on the set of inputs and
//! never on the order the build supplied them in.

use crate::types::LanguageLevels;
use crate::unpack::UnpackedArchive;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors rendering or writing a project descriptor.
#[derive(Debug, Error)]
pub enum DescriptorError {
    /// The module has no name.
    #[error("Project descriptor requires a non-empty module name")]
    EmptyModuleName,

    /// The XML writer failed.
    #[error("Failed to render project descriptor: {0}")]
    Render(String),

    /// The descriptor file could not be written.
    #[error("Failed to write project descriptor {path}: {source}")]
    Write {
        /// Descriptor path.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// Returns the descriptor location for `label` inside `working_dir`.
#[must_use]
pub fn descriptor_path(working_dir: &Path, label: &str) -> PathBuf {
    working_dir.join(format!("{label}_project_config.xml"))
}

/// Builder for the project descriptor of one module.
#[derive(Debug, Clone, Default)]
pub struct ProjectDescriptor {
    module_name: String,
    sources: BTreeSet<String>,
    resources: BTreeSet<String>,
    manifest: Option<String>,
    libraries: BTreeSet<String>,
    extracted_archives: BTreeSet<String>,
    custom_rules: BTreeSet<String>,
    baseline: Option<String>,
    language: LanguageLevels,
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn collect<'a, I>(set: &mut BTreeSet<String>, paths: I)
where
    I: IntoIterator<Item = &'a PathBuf>,
{
    set.extend(paths.into_iter().map(|p| path_string(p)));
}

impl ProjectDescriptor {
    /// Starts a descriptor for `module_name`.
    #[must_use]
    pub fn builder(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    /// Adds source files.
    #[must_use]
    pub fn sources<'a>(mut self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        collect(&mut self.sources, paths);
        self
    }

    /// Adds resource files.
    #[must_use]
    pub fn resources<'a>(mut self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        collect(&mut self.resources, paths);
        self
    }

    /// Sets the module manifest.
    #[must_use]
    pub fn manifest(mut self, path: Option<&Path>) -> Self {
        self.manifest = path.map(path_string);
        self
    }

    /// Adds plain library jars to the classpath.
    #[must_use]
    pub fn libraries<'a>(mut self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        collect(&mut self.libraries, paths);
        self
    }

    /// Adds extracted archives to the classpath, by extraction directory only.
    #[must_use]
    pub fn extracted_archives<'a>(
        mut self,
        unpacked: impl IntoIterator<Item = &'a UnpackedArchive>,
    ) -> Self {
        collect(
            &mut self.extracted_archives,
            unpacked.into_iter().map(|u| &u.directory),
        );
        self
    }

    /// Adds custom rule jars.
    #[must_use]
    pub fn custom_rules<'a>(mut self, paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        collect(&mut self.custom_rules, paths);
        self
    }

    /// Sets the baseline file the engine reads or creates.
    #[must_use]
    pub fn baseline(mut self, path: Option<&Path>) -> Self {
        self.baseline = path.map(path_string);
        self
    }

    /// Sets the language levels written on the module element.
    #[must_use]
    pub fn language(mut self, language: &LanguageLevels) -> Self {
        self.language = language.clone();
        self
    }

    /// Renders the descriptor as an XML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the module name is empty or the writer fails.
    pub fn render(&self) -> Result<String, DescriptorError> {
        if self.module_name.trim().is_empty() {
            return Err(DescriptorError::EmptyModuleName);
        }

        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        self.write_document(&mut writer)?;

        let mut xml = String::from_utf8(writer.into_inner())
            .map_err(|e| DescriptorError::Render(e.to_string()))?;
        xml.push('\n');
        Ok(xml)
    }

    /// Renders the descriptor and writes it to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn write_to(&self, path: &Path) -> Result<(), DescriptorError> {
        let xml = self.render()?;
        std::fs::write(path, xml).map_err(|e| DescriptorError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn write_document(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), DescriptorError> {
        write(writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(writer, Event::Start(BytesStart::new("project")))?;

        if let Some(baseline) = &self.baseline {
            empty(writer, "baseline", "file", baseline)?;
        }

        let mut module = BytesStart::new("module");
        module.push_attribute(("name", self.module_name.as_str()));
        module.push_attribute(("android", "true"));
        module.push_attribute(("library", "true"));
        if let Some(sdk) = &self.language.compile_sdk_version {
            module.push_attribute(("compile-sdk-version", sdk.as_str()));
        }
        if let Some(java) = &self.language.java {
            module.push_attribute(("javaLanguage", java.as_str()));
        }
        if let Some(kotlin) = &self.language.kotlin {
            module.push_attribute(("kotlinLanguage", kotlin.as_str()));
        }
        write(writer, Event::Start(module))?;

        for src in self.sources.iter().rev() {
            empty(writer, "src", "file", src)?;
        }
        for resource in self.resources.iter().rev() {
            empty(writer, "resource", "file", resource)?;
        }
        if let Some(manifest) = &self.manifest {
            empty(writer, "manifest", "file", manifest)?;
        }
        for jar in self.libraries.iter().rev() {
            empty(writer, "classpath", "jar", jar)?;
        }
        for dir in self.extracted_archives.iter().rev() {
            empty(writer, "aar", "extracted", dir)?;
        }
        for jar in self.custom_rules.iter().rev() {
            empty(writer, "lint-checks", "jar", jar)?;
        }

        write(writer, Event::End(BytesEnd::new("module")))?;
        write(writer, Event::End(BytesEnd::new("project")))
    }
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), DescriptorError> {
    writer
        .write_event(event)
        .map_err(|e| DescriptorError::Render(e.to_string()))
}

/// Writes `<tag attr="value"/>`.
fn empty(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    attr: &str,
    value: &str,
) -> Result<(), DescriptorError> {
    let mut element = BytesStart::new(tag);
    element.push_attribute((attr, value));
    write(writer, Event::Empty(element))
}
