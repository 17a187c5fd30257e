//! Demo windows
//!
//! A greeting window with a button, and a settings window whose widgets are
//! bound to a record. Scripted user edits are delivered while rendering.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tether_gui::{
    Bound, Button, Callback, Checkbox, ComboBox, Container, Element, FieldBinding, GuiHost, GuiResult,
    HeadlessToolkit, HostConfig, InputText, LabeledSlider, Record, Text, Ui, Value, WidgetParams, Window,
};

const BUTTON: &str = "main.button";
const ENABLED: &str = "settings.enabled";
const NAME: &str = "settings.name";
const QUALITY: &str = "settings.quality";
const VOLUME: &str = "settings.volume";

const QUALITY_ITEMS: [&str; 3] = ["low", "medium", "high"];

/// Outcome of a demo run
#[derive(Debug)]
pub struct Summary {
    pub frames: u64,
    pub clicks: u32,
    /// Final model fields in name order
    pub settings: Vec<(String, Value)>,
}

struct MainWindow {
    container: Container,
    clicks: Rc<Cell<u32>>,
    greeting: Option<Text>,
    button: Option<Button>,
}

impl MainWindow {
    fn new(clicks: Rc<Cell<u32>>) -> Self {
        Self {
            container: Container::window("Main Window").with_tag("main"),
            clicks,
            greeting: None,
            button: None,
        }
    }
}

impl Window for MainWindow {
    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn describe(&mut self, ui: &mut Ui<'_>) -> GuiResult<()> {
        self.greeting = Some(ui.text("Hello World!")?);

        let clicks = self.clicks.clone();
        let on_click = Callback::infallible(move |_| {
            clicks.set(clicks.get() + 1);
            tracing::info!(clicks = clicks.get(), "button clicked");
        });
        let mut button = Button::with_tag(BUTTON);
        ui.add(&mut button, WidgetParams::new().label("Click Me!").callback(on_click))?;
        self.button = Some(button);
        Ok(())
    }
}

struct SettingsWindow {
    container: Container,
    model: Rc<RefCell<Record>>,
    enabled: Option<Bound<Checkbox>>,
    name: Option<Bound<InputText>>,
    quality: Option<Bound<ComboBox>>,
    volume: Option<LabeledSlider>,
    extended: bool,
}

impl SettingsWindow {
    fn new(model: Rc<RefCell<Record>>) -> Self {
        Self {
            container: Container::window("Settings").with_tag("settings"),
            model,
            enabled: None,
            name: None,
            quality: None,
            volume: None,
            extended: false,
        }
    }

    fn field(&self, name: &str) -> FieldBinding {
        FieldBinding::on_model(&self.model, name)
    }
}

impl Window for SettingsWindow {
    fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    fn describe(&mut self, ui: &mut Ui<'_>) -> GuiResult<()> {
        let enabled = Checkbox::bind(ui.registry(), self.field("enabled"), ENABLED)?;
        ui.add_bound(&enabled, WidgetParams::new().label("Enabled"))?;

        let name = InputText::bind(ui.registry(), self.field("name"), NAME)?;
        ui.add_bound(&name, WidgetParams::new().label("Name"))?;

        let quality = ComboBox::bind(ui.registry(), self.field("quality"), QUALITY_ITEMS, QUALITY)?;
        ui.add_bound(&quality, WidgetParams::new().label("Quality"))?;

        let mut volume = LabeledSlider::bind(ui.registry(), self.field("volume"), "Volume", VOLUME)?.horizontal();
        volume.materialize(ui.toolkit(), WidgetParams::new().range(0.0, 1.0))?;

        self.enabled = Some(enabled);
        self.name = Some(name);
        self.quality = Some(quality);
        self.volume = Some(volume);
        Ok(())
    }

    fn update(&mut self, _ui: &mut Ui<'_>) -> GuiResult<()> {
        if self.extended || self.model.borrow().get("enabled") != Some(&Value::Bool(true)) {
            return Ok(());
        }

        // Enabling unlocks the extra quality level
        if let Some(quality) = &self.quality {
            quality.set_items(QUALITY_ITEMS.into_iter().chain(["ultra"]))?;
            tracing::info!("added 'ultra' quality");
        }
        self.extended = true;
        Ok(())
    }
}

/// Queue the user edits the demo plays back
fn script(toolkit: &mut HeadlessToolkit) {
    toolkit.schedule_change(1, BUTTON, Value::Null);
    toolkit.schedule_change(2, ENABLED, true);
    toolkit.schedule_change(3, NAME, "tether");
    toolkit.schedule_change(4, VOLUME, 0.8);
    toolkit.schedule_change(6, QUALITY, "ultra");
}

/// Run the demo until the configured frame limit
pub fn run(config: HostConfig) -> GuiResult<Summary> {
    let model = Rc::new(RefCell::new(
        Record::new()
            .with("enabled", Value::Null)
            .with("name", "")
            .with("quality", "medium")
            .with("volume", 0.5),
    ));
    let clicks = Rc::new(Cell::new(0));

    let mut toolkit = HeadlessToolkit::new();
    script(&mut toolkit);

    let mut host = GuiHost::with_config(toolkit, config);
    host.add_window("main", MainWindow::new(clicks.clone()))?;
    host.add_window("settings", SettingsWindow::new(model.clone()))?;

    let frames = host.run()?;
    let settings = model
        .borrow()
        .fields()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect();

    Ok(Summary {
        frames,
        clicks: clicks.get(),
        settings,
    })
}
