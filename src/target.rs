/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! The two supported x86 machine modes. Real mode and system-management
//! mode are rejected wherever a mode is parsed from outside the core.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Protected,
    Long,
}

impl Mode {
    /// Machine pointer width in bytes: `W` throughout §4.5.2/§4.5.3.
    pub fn pointer_width(self) -> u32 {
        match self {
            Mode::Protected => 4,
            Mode::Long => 8,
        }
    }
}
