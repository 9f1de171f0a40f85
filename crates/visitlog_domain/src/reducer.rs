use crate::{Action, Effect, PagePhase, RecordOrigin, SaveTrigger, SettingsPage};

impl SettingsPage {
    pub fn apply(&mut self, action: Action) -> Vec<Effect> {
        if self.phase == PagePhase::Disposed {
            return Vec::new();
        }

        match action {
            Action::Activate => {
                if self.phase != PagePhase::Uninitialized || self.load_in_flight {
                    return Vec::new();
                }
                self.load_in_flight = true;
                self.last_error = None;
                vec![Effect::LoadOrCreateSettings]
            }
            Action::SettingsLoaded { loaded, at } => {
                if !self.load_in_flight {
                    return Vec::new();
                }
                self.load_in_flight = false;

                let mut record = loaded.record;
                match loaded.origin {
                    RecordOrigin::Created => {
                        self.record = Some(record);
                        self.phase = PagePhase::Ready;
                        Vec::new()
                    }
                    RecordOrigin::Existing => {
                        record.record_visit(at);
                        self.record = Some(record);
                        vec![Effect::SaveSettings {
                            trigger: SaveTrigger::Activation,
                            at,
                        }]
                    }
                }
            }
            Action::SettingsLoadFailed { error } => {
                self.load_in_flight = false;
                self.record = None;
                self.last_error = Some(error);
                Vec::new()
            }

            Action::SaveRequested { at } => {
                if self.phase != PagePhase::Ready || self.record.is_none() {
                    return Vec::new();
                }
                vec![Effect::SaveSettings {
                    trigger: SaveTrigger::User,
                    at,
                }]
            }
            Action::SettingsSaved {
                trigger,
                record,
                at,
            } => {
                match trigger {
                    SaveTrigger::Activation => {
                        if self.phase == PagePhase::Uninitialized && self.record.is_some() {
                            self.record = Some(*record);
                            self.phase = PagePhase::Ready;
                        }
                    }
                    SaveTrigger::User => {
                        if self.phase == PagePhase::Ready {
                            self.record = Some(*record);
                        }
                        self.last_saved_at = Some(at);
                        self.last_error = None;
                    }
                }
                Vec::new()
            }
            Action::SettingsSaveFailed { trigger, error } => {
                if trigger == SaveTrigger::Activation && self.phase == PagePhase::Uninitialized {
                    self.record = None;
                }
                self.last_error = Some(error);
                Vec::new()
            }

            Action::Teardown => {
                self.phase = PagePhase::Disposed;
                self.load_in_flight = false;
                vec![Effect::ReleaseConnection]
            }
            Action::ClearError => {
                self.last_error = None;
                Vec::new()
            }
        }
    }
}
